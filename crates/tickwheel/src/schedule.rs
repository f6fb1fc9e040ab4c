//! Deadline generators for recurring tasks

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Yields successive absolute deadlines for a recurring task.
///
/// `now_ns` is the current time in nanoseconds since the clock epoch; the
/// returned deadline uses the same scale. Returning `None` ends the task:
/// the pending invocation completes and the entry is never re-armed.
pub trait Schedule: Send + Sync {
    fn next(&self, now_ns: i64) -> Option<i64>;
}

/// Closures over `now_ns` are schedules too.
impl<F> Schedule for F
where
    F: Fn(i64) -> Option<i64> + Send + Sync,
{
    fn next(&self, now_ns: i64) -> Option<i64> {
        self(now_ns)
    }
}

/// Fixed-interval schedule: fires every `interval` until stopped.
pub struct Every(pub Duration);

impl Schedule for Every {
    fn next(&self, now_ns: i64) -> Option<i64> {
        Some(now_ns + self.0.as_nanos() as i64)
    }
}

/// Fixed-count schedule: fires `times` times at `interval` spacing, then
/// stops on its own.
pub struct Times {
    interval: Duration,
    remaining: AtomicU32,
}

impl Times {
    pub fn new(interval: Duration, times: u32) -> Self {
        Self {
            interval,
            remaining: AtomicU32::new(times),
        }
    }

    /// Invocations not yet claimed by the wheel.
    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::SeqCst)
    }
}

impl Schedule for Times {
    fn next(&self, now_ns: i64) -> Option<i64> {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()
            .map(|_| now_ns + self.interval.as_nanos() as i64)
    }
}
