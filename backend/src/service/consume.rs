use std::sync::Arc;

use corelib::models::{InstrumentId, PricePayload};

use crate::prices::InstrumentPriceHistory;
use crate::service::PriceConsumer;

/// Read side. Only ever sees prices of finished runs.
pub struct PriceConsumeService {
    history: Arc<InstrumentPriceHistory>,
}

impl PriceConsumeService {
    pub fn new(history: Arc<InstrumentPriceHistory>) -> Self {
        Self { history }
    }
}

impl PriceConsumer for PriceConsumeService {
    fn last_price_by_id(&self, instrument: &InstrumentId) -> Option<PricePayload> {
        self.history.current_last_price(instrument)
    }
}
