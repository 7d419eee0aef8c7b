use chrono::{DateTime, Utc};
use corelib::models::{InstrumentId, PriceObservation, PricePayload};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Position of an observation in its instrument's history.
///
/// `merge_seq` is assigned when the observation is merged and breaks
/// exact-timestamp ties in favour of the later merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PriceKey {
    pub observed_at: DateTime<Utc>,
    pub merge_seq: u64,
}

/// An observation together with its history key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankedPrice {
    pub key: PriceKey,
    pub observation: PriceObservation,
}

/// O(1) read model: the newest merged observation per instrument.
///
/// Writers go through [`LastPriceView::publish`], which only ever moves an
/// entry forward in `PriceKey` order.
#[derive(Default)]
pub struct LastPriceView {
    latest: DashMap<InstrumentId, RankedPrice>,
}

impl LastPriceView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare-and-update under the instrument's shard guard.
    ///
    /// Keys are unique per merged observation, so an equal key means the
    /// candidate is already published. Returns true only if the entry moved.
    pub fn publish(&self, candidate: RankedPrice) -> bool {
        match self.latest.entry(candidate.observation.instrument.clone()) {
            Entry::Occupied(mut cur) => {
                if candidate.key > cur.get().key {
                    cur.insert(candidate);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(candidate);
                true
            }
        }
    }

    pub fn payload(&self, instrument: &InstrumentId) -> Option<PricePayload> {
        self.latest
            .get(instrument)
            .map(|p| p.observation.payload.clone())
    }

    pub fn observation(&self, instrument: &InstrumentId) -> Option<PriceObservation> {
        self.latest.get(instrument).map(|p| p.observation.clone())
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ranked(instrument: &str, secs: i64, seq: u64) -> RankedPrice {
        let observed_at = Utc.timestamp_opt(secs, 0).unwrap();
        RankedPrice {
            key: PriceKey {
                observed_at,
                merge_seq: seq,
            },
            observation: PriceObservation::new(
                instrument,
                observed_at,
                format!("{secs}/{seq}").as_str(),
            ),
        }
    }

    #[test]
    fn unknown_instrument_reads_none() {
        let view = LastPriceView::new();
        assert!(view.payload(&"A".into()).is_none());
        assert!(view.is_empty());
    }

    #[test]
    fn older_candidate_never_replaces_newer() {
        let view = LastPriceView::new();

        assert!(view.publish(ranked("A", 20, 1)));
        assert!(!view.publish(ranked("A", 10, 2)));

        assert_eq!(view.payload(&"A".into()), Some("20/1".into()));
    }

    #[test]
    fn equal_timestamp_prefers_later_merge() {
        let view = LastPriceView::new();

        assert!(view.publish(ranked("A", 10, 1)));
        assert!(view.publish(ranked("A", 10, 2)));
        assert!(!view.publish(ranked("A", 10, 1)));

        assert_eq!(view.payload(&"A".into()), Some("10/2".into()));
    }

    #[test]
    fn instruments_are_independent() {
        let view = LastPriceView::new();

        view.publish(ranked("A", 30, 1));
        view.publish(ranked("B", 5, 2));

        assert_eq!(view.len(), 2);
        assert_eq!(view.payload(&"B".into()), Some("5/2".into()));
    }
}
