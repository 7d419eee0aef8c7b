use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::price::PriceObservation;

/// Identifier of a producer-declared batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchRunId(Uuid);

impl BatchRunId {
    /// Fresh random run id (uuid v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BatchRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One `publish` call worth of observations for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBatch {
    pub run_id: BatchRunId,
    pub observations: Vec<PriceObservation>,
}

impl PriceBatch {
    pub fn new(run_id: BatchRunId, observations: Vec<PriceObservation>) -> Self {
        Self {
            run_id,
            observations,
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchRunStatus {
    Announced,
    InProgress,
    Canceled,
    Finished,
    Error,
}

/// Result of a lifecycle call. Never stored; the only per-run state is
/// whether a staging slot currently exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRunOutcome {
    pub run_id: BatchRunId,
    pub status: BatchRunStatus,
}

impl BatchRunOutcome {
    pub fn new(run_id: BatchRunId, status: BatchRunStatus) -> Self {
        Self { run_id, status }
    }
}
