use std::str::FromStr;

/// Widest batch size range an operator may configure.
pub const BATCH_SIZE_FLOOR: usize = 1;
pub const BATCH_SIZE_CEILING: usize = 1_000;

#[derive(Clone, Debug)]
pub struct AppConfig {
    // =========================
    // Batch validation
    // =========================
    /// Smallest number of observations accepted by a single publish call.
    pub min_batch_size: usize,

    /// Largest number of observations accepted by a single publish call.
    ///
    /// Bounds the amount of work a producer can stage per call.
    /// Arrival rate is not throttled.
    pub max_batch_size: usize,

    /// Merges slower than this are logged at warn level.
    pub slow_merge_ms: u64,

    // =========================
    // Demo feed (binary only)
    // =========================
    /// Number of concurrent synthetic producers.
    pub feed_producers: usize,

    /// Size of the synthetic instrument universe.
    pub feed_instruments: usize,

    /// Observations per published batch.
    pub feed_batch_size: usize,

    /// Pause between runs of a single producer.
    pub feed_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            min_batch_size: 1,
            max_batch_size: 1_000,
            slow_merge_ms: 50,

            feed_producers: 4,
            feed_instruments: 16,
            feed_batch_size: 100,
            feed_interval_ms: 500,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let d = Self::default();

        let (min_batch_size, max_batch_size) = batch_bounds(
            env_or("PRICE_MIN_BATCH_SIZE", d.min_batch_size),
            env_or("PRICE_MAX_BATCH_SIZE", d.max_batch_size),
        );

        Self {
            min_batch_size,
            max_batch_size,
            slow_merge_ms: env_or("PRICE_SLOW_MERGE_MS", d.slow_merge_ms),

            feed_producers: env_or("PRICE_FEED_PRODUCERS", d.feed_producers),
            feed_instruments: env_or("PRICE_FEED_INSTRUMENTS", d.feed_instruments).max(1),
            feed_batch_size: env_or("PRICE_FEED_BATCH_SIZE", d.feed_batch_size)
                .clamp(min_batch_size, max_batch_size),
            feed_interval_ms: env_or("PRICE_FEED_INTERVAL_MS", d.feed_interval_ms),
        }
    }
}

/// Narrows configured bounds into `[BATCH_SIZE_FLOOR, BATCH_SIZE_CEILING]`
/// with `min <= max`. Empty batches are always rejected.
pub(crate) fn batch_bounds(min: usize, max: usize) -> (usize, usize) {
    let min = min.clamp(BATCH_SIZE_FLOOR, BATCH_SIZE_CEILING);
    let max = max.clamp(min, BATCH_SIZE_CEILING);
    (min, max)
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = %default, "invalid config value; using default");
            default
        }),
        Err(_) => default,
    }
}
