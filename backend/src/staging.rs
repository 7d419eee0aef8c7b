use corelib::models::{BatchRunId, PriceObservation};
use dashmap::DashMap;
use tracing::{debug, instrument};

use crate::error::AppError;

/// Holding area for observations of runs that are announced but not yet
/// finished or canceled.
///
/// Guarantees:
/// - A slot exists for a run iff it was announced and not yet released or discarded.
/// - Slots live in a sharded map; unrelated runs rarely contend.
/// - `append` mutates a slot while holding its shard guard and `release` /
///   `discard` remove it under the same guard. An append is therefore either
///   fully contained in the drained result or fails with `RunNotFound`.
#[derive(Default)]
pub struct BatchStagingArea {
    runs: DashMap<BatchRunId, Vec<PriceObservation>>,
}

impl BatchStagingArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an empty slot. Re-announcing a live run keeps its contents.
    #[instrument(skip(self, run_id), target = "staging", fields(run_id = %run_id))]
    pub fn announce(&self, run_id: BatchRunId) {
        let slot = self.runs.entry(run_id).or_default();
        debug!(staged = slot.len(), "run slot open");
    }

    /// Appends to an open slot.
    #[instrument(
        skip(self, observations),
        target = "staging",
        fields(run_id = %run_id, count = observations.len())
    )]
    pub fn append(
        &self,
        run_id: BatchRunId,
        observations: Vec<PriceObservation>,
    ) -> Result<(), AppError> {
        let Some(mut slot) = self.runs.get_mut(&run_id) else {
            debug!("append rejected; no open slot");
            return Err(AppError::RunNotFound(run_id));
        };

        slot.extend(observations);
        debug!(staged = slot.len(), "observations staged");
        Ok(())
    }

    /// Removes the slot and hands its contents to exactly one caller.
    /// Absent runs yield an empty vec.
    #[instrument(skip(self, run_id), target = "staging", fields(run_id = %run_id))]
    pub fn release(&self, run_id: BatchRunId) -> Vec<PriceObservation> {
        match self.runs.remove(&run_id) {
            Some((_, staged)) => {
                debug!(count = staged.len(), "run slot released");
                staged
            }
            None => {
                debug!("release of absent run; nothing to drain");
                Vec::new()
            }
        }
    }

    /// Drops the slot and its contents. Returns whether a slot existed.
    #[instrument(skip(self, run_id), target = "staging", fields(run_id = %run_id))]
    pub fn discard(&self, run_id: BatchRunId) -> bool {
        match self.runs.remove(&run_id) {
            Some((_, staged)) => {
                debug!(count = staged.len(), "run slot discarded");
                true
            }
            None => false,
        }
    }

    pub fn is_open(&self, run_id: &BatchRunId) -> bool {
        self.runs.contains_key(run_id)
    }

    /// Number of observations currently staged for a run, if it is open.
    pub fn staged_len(&self, run_id: &BatchRunId) -> Option<usize> {
        self.runs.get(run_id).map(|slot| slot.len())
    }

    pub fn open_runs(&self) -> usize {
        self.runs.len()
    }
}
