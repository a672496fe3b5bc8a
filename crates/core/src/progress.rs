//! Progress reporting and cooperative cancellation
//!
//! Operations receive a `&dyn Progress` and report completed work units at
//! coarse intervals (per image row or per feature). Implementations must be
//! cheap and non-blocking because they are called from worker threads.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Sink for progress updates
pub trait Progress: Send + Sync {
    /// Announce the total number of work units of the next phase
    fn start(&self, _total: u64) {}

    /// `n` more units are done
    fn update(&self, n: u64);

    /// Free-form status message
    fn inform(&self, _message: &str) {}

    /// Polled at every update point; `true` stops the operation
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Progress sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn update(&self, _n: u64) {}
}

/// Thread-safe counter that can also request cancellation
#[derive(Debug, Default)]
pub struct ProgressCounter {
    total: AtomicU64,
    done: AtomicU64,
    cancelled: AtomicBool,
    cancel_after: Option<u64>,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter that reports cancellation once `units` have completed
    pub fn cancel_after(units: u64) -> Self {
        Self {
            cancel_after: Some(units),
            ..Self::default()
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

impl Progress for ProgressCounter {
    fn start(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
        self.done.store(0, Ordering::Relaxed);
    }

    fn update(&self, n: u64) {
        self.done.fetch_add(n, Ordering::Relaxed);
    }

    fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::Relaxed) {
            return true;
        }
        matches!(self.cancel_after, Some(limit) if self.done() >= limit)
    }
}
