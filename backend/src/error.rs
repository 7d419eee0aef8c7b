use corelib::models::BatchRunId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("batch size {size} outside allowed range [{min}, {max}]")]
    InvalidBatchSize { size: usize, min: usize, max: usize },

    #[error("batch run not found: {0}")]
    RunNotFound(BatchRunId),
}
