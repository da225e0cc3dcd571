use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Atomic outcome counters updated by the scheduler and resource manager
/// without taking the scheduling lock.
#[derive(Clone, Default)]
pub struct Counters {
    pub rounds_run: Arc<AtomicU64>,
    pub tasks_submitted: Arc<AtomicU64>,
    pub tasks_allocated: Arc<AtomicU64>,
    pub tasks_dropped_infeasible: Arc<AtomicU64>,
    pub tasks_dropped_not_enough_blocks: Arc<AtomicU64>,
    pub knapsack_timeouts: Arc<AtomicU64>,
    pub blocks_created: Arc<AtomicU64>,
}

impl Counters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
