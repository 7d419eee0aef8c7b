use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a tradable instrument. Opaque to the pricing core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentId(String);

impl InstrumentId {
    pub fn new(v: impl Into<String>) -> Self {
        Self(v.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstrumentId {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

impl From<String> for InstrumentId {
    fn from(v: String) -> Self {
        Self(v)
    }
}

/// Uninterpreted price blob carried with every observation.
///
/// Backed by a shared slice so that copies held by the history and the
/// last price view do not duplicate the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PricePayload(Arc<[u8]>);

impl PricePayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for PricePayload {
    fn from(v: &str) -> Self {
        Self(Arc::from(v.as_bytes()))
    }
}

impl From<Vec<u8>> for PricePayload {
    fn from(v: Vec<u8>) -> Self {
        Self(Arc::from(v))
    }
}

/// A single price seen for an instrument at `observed_at`.
///
/// Two observations of the same instrument are ordered by `observed_at`
/// only; equal timestamps are resolved by merge order, not by payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub instrument: InstrumentId,
    pub observed_at: DateTime<Utc>,
    pub payload: PricePayload,
}

impl PriceObservation {
    pub fn new(
        instrument: impl Into<InstrumentId>,
        observed_at: DateTime<Utc>,
        payload: impl Into<PricePayload>,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            observed_at,
            payload: payload.into(),
        }
    }
}
