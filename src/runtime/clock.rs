//! Abstraction over time so the resource manager can run against either a
//! real wall clock or a fast simulated one, sharing the same suspension
//! point contract described in `SPEC_FULL.md` §5.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

#[async_trait]
pub trait Clock: Send + Sync {
    /// Suspend the caller for `n` logical ticks, then return the new tick
    /// count.
    async fn sleep_ticks(&self, n: u64) -> u64;

    fn now(&self) -> u64;
}

/// Wall-clock backed implementation: one tick is `tick_duration`.
pub struct RealClock {
    tick_duration: Duration,
    now: AtomicU64,
}

impl RealClock {
    pub fn new(tick_duration: Duration) -> Self {
        Self { tick_duration, now: AtomicU64::new(0) }
    }
}

#[async_trait]
impl Clock for RealClock {
    async fn sleep_ticks(&self, n: u64) -> u64 {
        if n > 0 {
            tokio::time::sleep(self.tick_duration * n as u32).await;
        }
        self.now.fetch_add(n, Ordering::Relaxed) + n
    }

    fn now(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}

/// Simulated clock: advances a virtual counter without a real wait, yielding
/// to the async runtime so other tasks make progress. Used for fast,
/// deterministic batch replays and tests.
pub struct SimClock {
    now: AtomicU64,
}

impl SimClock {
    pub fn new() -> Self {
        Self { now: AtomicU64::new(0) }
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SimClock {
    async fn sleep_ticks(&self, n: u64) -> u64 {
        tokio::task::yield_now().await;
        self.now.fetch_add(n, Ordering::Relaxed) + n
    }

    fn now(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}
