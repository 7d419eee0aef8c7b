use std::sync::Arc;
use std::time::Duration;

use corelib::models::{BatchRunId, BatchRunOutcome, BatchRunStatus, PriceBatch};
use tracing::{info, instrument, warn};

use crate::config::{AppConfig, batch_bounds};
use crate::error::AppError;
use crate::logger::warn_if_slow;
use crate::metrics::counters::Counters;
use crate::prices::InstrumentPriceHistory;
use crate::service::PricePublisher;
use crate::staging::BatchStagingArea;

/// Orchestrates batch runs: staging on publish, merge into history on
/// finish, drop on cancel.
///
/// This is the only layer that turns internal staging signals into
/// outcome statuses; callers never see `RunNotFound`.
pub struct PricePublishService {
    staging: Arc<BatchStagingArea>,
    history: Arc<InstrumentPriceHistory>,
    min_batch_size: usize,
    max_batch_size: usize,
    slow_merge: Duration,
    counters: Counters,
}

impl PricePublishService {
    pub fn new(
        staging: Arc<BatchStagingArea>,
        history: Arc<InstrumentPriceHistory>,
        cfg: &AppConfig,
        counters: Counters,
    ) -> Self {
        let (min_batch_size, max_batch_size) =
            batch_bounds(cfg.min_batch_size, cfg.max_batch_size);
        Self {
            staging,
            history,
            min_batch_size,
            max_batch_size,
            slow_merge: Duration::from_millis(cfg.slow_merge_ms),
            counters,
        }
    }

    fn validate(&self, batch: &PriceBatch) -> Result<(), AppError> {
        let size = batch.len();
        if size < self.min_batch_size || size > self.max_batch_size {
            return Err(AppError::InvalidBatchSize {
                size,
                min: self.min_batch_size,
                max: self.max_batch_size,
            });
        }
        Ok(())
    }
}

impl PricePublisher for PricePublishService {
    #[instrument(skip(self), target = "lifecycle")]
    fn announce_batch_run(&self) -> BatchRunOutcome {
        let run_id = BatchRunId::generate();
        self.staging.announce(run_id);
        Counters::incr(&self.counters.runs_announced);

        info!(run_id = %run_id, "batch run announced");
        BatchRunOutcome::new(run_id, BatchRunStatus::Announced)
    }

    #[instrument(
        skip(self, batch),
        target = "lifecycle",
        fields(run_id = %batch.run_id, size = batch.len())
    )]
    fn publish_batch(&self, batch: PriceBatch) -> Result<BatchRunOutcome, AppError> {
        if let Err(e) = self.validate(&batch) {
            Counters::incr(&self.counters.batches_rejected);
            warn!(error = %e, "batch rejected");
            return Err(e);
        }

        let run_id = batch.run_id;
        let status = match self.staging.append(run_id, batch.observations) {
            Ok(()) => {
                Counters::incr(&self.counters.batches_published);
                BatchRunStatus::InProgress
            }
            Err(e) => {
                Counters::incr(&self.counters.batches_orphaned);
                warn!(error = %e, "publish against closed or unknown run; observations dropped");
                BatchRunStatus::Error
            }
        };

        Ok(BatchRunOutcome::new(run_id, status))
    }

    #[instrument(skip(self, run_id), target = "lifecycle", fields(run_id = %run_id))]
    fn finish_batch_run(&self, run_id: BatchRunId) -> BatchRunOutcome {
        let drained = self.staging.release(run_id);
        let count = drained.len() as u64;

        let report = warn_if_slow("merge_batch_run", self.slow_merge, || {
            self.history.merge(drained)
        });

        Counters::incr(&self.counters.runs_finished);
        Counters::add(&self.counters.observations_merged, count);
        Counters::add(&self.counters.view_updates, report.view_updates as u64);
        Counters::add(&self.counters.view_unchanged, report.unchanged as u64);

        info!(
            observations = report.observations,
            instruments = report.instruments,
            view_updates = report.view_updates,
            "batch run finished"
        );
        BatchRunOutcome::new(run_id, BatchRunStatus::Finished)
    }

    #[instrument(skip(self, run_id), target = "lifecycle", fields(run_id = %run_id))]
    fn cancel_batch_run(&self, run_id: BatchRunId) -> BatchRunOutcome {
        let existed = self.staging.discard(run_id);
        Counters::incr(&self.counters.runs_canceled);

        info!(existed, "batch run canceled");
        BatchRunOutcome::new(run_id, BatchRunStatus::Canceled)
    }
}
