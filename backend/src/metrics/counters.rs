use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Minimal counters for operational visibility.
#[derive(Clone, Default, Debug)]
pub struct Counters {
    pub runs_announced: Arc<AtomicU64>,
    pub runs_finished: Arc<AtomicU64>,
    pub runs_canceled: Arc<AtomicU64>,

    pub batches_published: Arc<AtomicU64>,
    pub batches_rejected: Arc<AtomicU64>,
    // publish against an absent run
    pub batches_orphaned: Arc<AtomicU64>,

    pub observations_merged: Arc<AtomicU64>,
    pub view_updates: Arc<AtomicU64>,
    pub view_unchanged: Arc<AtomicU64>,
}

impl Counters {
    pub fn incr(c: &AtomicU64) {
        c.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(c: &AtomicU64, n: u64) {
        c.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(c: &AtomicU64) -> u64 {
        c.load(Ordering::Relaxed)
    }
}
