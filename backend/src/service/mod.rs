pub mod consume;
pub mod engine;
pub mod publish;

use corelib::models::{BatchRunId, BatchRunOutcome, InstrumentId, PriceBatch, PricePayload};

use crate::error::AppError;

pub use consume::PriceConsumeService;
pub use engine::PriceEngine;
pub use publish::PricePublishService;

/// Producer-facing batch run lifecycle.
///
/// Only `publish_batch` can fail, and only on validation. Operations on
/// unknown or already-closed runs are reported through the outcome status.
pub trait PricePublisher: Send + Sync {
    fn announce_batch_run(&self) -> BatchRunOutcome;

    fn publish_batch(&self, batch: PriceBatch) -> Result<BatchRunOutcome, AppError>;

    fn finish_batch_run(&self, run_id: BatchRunId) -> BatchRunOutcome;

    fn cancel_batch_run(&self, run_id: BatchRunId) -> BatchRunOutcome;
}

/// Reader-facing query over committed prices.
pub trait PriceConsumer: Send + Sync {
    fn last_price_by_id(&self, instrument: &InstrumentId) -> Option<PricePayload>;
}
