pub mod batch;
pub mod price;

pub use batch::{BatchRunId, BatchRunOutcome, BatchRunStatus, PriceBatch};
pub use price::{InstrumentId, PriceObservation, PricePayload};
