//! Time sources.
//!
//! Test ids and pending-queue ids are derived from timestamps, so every
//! clock here returns strictly increasing values.

use quizsync_engine::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time in milliseconds since the epoch.
pub trait Clock: Send + Sync {
    /// Current time, strictly greater than any value returned before.
    fn now(&self) -> Timestamp;
}

/// Wall clock, nudged forward when two calls land in the same millisecond.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let mut last = self.last.load(Ordering::Acquire);
        loop {
            let next = wall.max(last + 1);
            match self
                .last
                .compare_exchange(last, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

/// Manually driven clock: each call returns the current value and ticks it.
#[derive(Debug)]
pub struct ManualClock {
    next: AtomicU64,
}

impl ManualClock {
    pub fn starting_at(timestamp: Timestamp) -> Self {
        Self {
            next: AtomicU64::new(timestamp),
        }
    }

    /// Jump forward by `millis`.
    pub fn advance(&self, millis: u64) {
        self.next.fetch_add(millis, Ordering::SeqCst);
    }

    /// The value the next call to [`Clock::now`] will return.
    pub fn peek(&self) -> Timestamp {
        self.next.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}
