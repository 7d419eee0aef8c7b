use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use corelib::models::{InstrumentId, PriceObservation, PricePayload};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::prices::last_price::{LastPriceView, PriceKey, RankedPrice};

/// Append-only, time-ordered history of a single instrument.
#[derive(Default)]
struct InstrumentHistory {
    entries: BTreeMap<PriceKey, PriceObservation>,
}

impl InstrumentHistory {
    fn newest(&self) -> Option<RankedPrice> {
        self.entries
            .last_key_value()
            .map(|(key, observation)| RankedPrice {
                key: *key,
                observation: observation.clone(),
            })
    }
}

/// Summary of one [`InstrumentPriceHistory::merge`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub observations: usize,
    pub instruments: usize,
    /// Instruments whose last price moved.
    pub view_updates: usize,
    /// Instruments whose newest entry was already published, by an earlier
    /// merge or a concurrent one.
    pub unchanged: usize,
}

/// Durable (process-lifetime) per-instrument price history and the owner of
/// the derived [`LastPriceView`].
///
/// Each instrument's history sits behind its own lock, held only while
/// inserting and reading the newest key. The view publish happens after the
/// lock is dropped and is a compare-and-update, so racing merges cannot
/// regress the last price.
pub struct InstrumentPriceHistory {
    histories: DashMap<InstrumentId, Arc<Mutex<InstrumentHistory>>>,
    view: Arc<LastPriceView>,
    merge_seq: AtomicU64,
}

impl InstrumentPriceHistory {
    pub fn new(view: Arc<LastPriceView>) -> Self {
        Self {
            histories: DashMap::new(),
            view,
            merge_seq: AtomicU64::new(0),
        }
    }

    pub fn view(&self) -> &Arc<LastPriceView> {
        &self.view
    }

    /// Appends observations to their instruments' histories and publishes
    /// each touched instrument's newest entry into the view.
    #[instrument(skip(self, observations), target = "history", fields(count = observations.len()))]
    pub fn merge(&self, observations: Vec<PriceObservation>) -> MergeReport {
        let mut report = MergeReport {
            observations: observations.len(),
            ..MergeReport::default()
        };
        if observations.is_empty() {
            return report;
        }

        // Input order is preserved per instrument so later entries get later seqs.
        let mut grouped: HashMap<InstrumentId, Vec<PriceObservation>> = HashMap::new();
        for obs in observations {
            grouped.entry(obs.instrument.clone()).or_default().push(obs);
        }
        report.instruments = grouped.len();

        for (instrument, group) in grouped {
            let history = self.history_for(&instrument);

            let candidate = {
                let mut h = history.lock();
                for obs in group {
                    let key = PriceKey {
                        observed_at: obs.observed_at,
                        merge_seq: self.merge_seq.fetch_add(1, Ordering::Relaxed),
                    };
                    h.entries.insert(key, obs);
                }
                h.newest()
            };

            let Some(candidate) = candidate else {
                continue;
            };

            if self.view.publish(candidate) {
                report.view_updates += 1;
            } else {
                report.unchanged += 1;
                debug!(instrument = %instrument, "last price unchanged");
            }
        }

        debug!(
            instruments = report.instruments,
            view_updates = report.view_updates,
            unchanged = report.unchanged,
            "merge complete"
        );
        report
    }

    /// Last price payload for an instrument, if it was ever merged.
    pub fn current_last_price(&self, instrument: &InstrumentId) -> Option<PricePayload> {
        self.view.payload(instrument)
    }

    pub fn current_last_observation(&self, instrument: &InstrumentId) -> Option<PriceObservation> {
        self.view.observation(instrument)
    }

    /// Number of observations ever merged for an instrument.
    pub fn history_len(&self, instrument: &InstrumentId) -> usize {
        self.histories
            .get(instrument)
            .map(|h| h.lock().entries.len())
            .unwrap_or(0)
    }

    fn history_for(&self, instrument: &InstrumentId) -> Arc<Mutex<InstrumentHistory>> {
        if let Some(existing) = self.histories.get(instrument) {
            return Arc::clone(existing.value());
        }
        Arc::clone(self.histories.entry(instrument.clone()).or_default().value())
    }
}
