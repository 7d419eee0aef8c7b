use std::sync::Arc;

use crate::config::AppConfig;
use crate::metrics::counters::Counters;
use crate::prices::{InstrumentPriceHistory, LastPriceView};
use crate::service::{PriceConsumeService, PricePublishService};
use crate::staging::BatchStagingArea;

/// Owns the shared stores for one process and the two services built on
/// top of them. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct PriceEngine {
    pub staging: Arc<BatchStagingArea>,
    pub history: Arc<InstrumentPriceHistory>,
    pub publisher: Arc<PricePublishService>,
    pub consumer: Arc<PriceConsumeService>,
    pub counters: Counters,
}

impl PriceEngine {
    pub fn new(cfg: &AppConfig) -> Self {
        let counters = Counters::default();
        let staging = Arc::new(BatchStagingArea::new());
        let history = Arc::new(InstrumentPriceHistory::new(Arc::new(LastPriceView::new())));

        let publisher = Arc::new(PricePublishService::new(
            Arc::clone(&staging),
            Arc::clone(&history),
            cfg,
            counters.clone(),
        ));
        let consumer = Arc::new(PriceConsumeService::new(Arc::clone(&history)));

        tracing::info!(
            min_batch_size = cfg.min_batch_size,
            max_batch_size = cfg.max_batch_size,
            "price engine initialized"
        );

        Self {
            staging,
            history,
            publisher,
            consumer,
            counters,
        }
    }
}
