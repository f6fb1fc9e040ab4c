//! Buckets: per-quantum timer lists

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use crate::entry::TimerEntry;

/// One expiration quantum's worth of timers.
///
/// `expiration` is the quantum this bucket currently represents, −1 while
/// unassigned. It is read and written without the list lock so the
/// dispatcher can snapshot it cheaply. While it is ≥ 0 the bucket is
/// registered in the delay queue under that priority.
///
/// Buckets are allocated once at wheel construction and reused for the
/// lifetime of the wheel.
pub(crate) struct Bucket {
    expiration: AtomicI64,
    timers: Mutex<Vec<Arc<TimerEntry>>>,
}

impl Bucket {
    pub(crate) fn new() -> Self {
        Self {
            expiration: AtomicI64::new(-1),
            timers: Mutex::new(Vec::new()),
        }
    }

    #[inline]
    pub(crate) fn expiration(&self) -> i64 {
        self.expiration.load(Ordering::SeqCst)
    }

    /// Stamp the bucket with a new quantum. True iff the stamp changed;
    /// the caller must then (re)offer the bucket to the delay queue.
    pub(crate) fn set_expiration(&self, expiration: i64) -> bool {
        self.expiration.swap(expiration, Ordering::SeqCst) != expiration
    }

    /// Append a timer. O(1) amortised.
    pub(crate) fn add(&self, entry: Arc<TimerEntry>) {
        self.timers.lock().unwrap().push(entry);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.timers.lock().unwrap().len()
    }

    /// Detach every timer, clear the stamp, then hand live entries to
    /// `reinsert`.
    ///
    /// `reinsert` runs outside the list lock: it may lock a sibling bucket
    /// when it demotes a timer into a lower wheel.
    pub(crate) fn flush(&self, reinsert: impl Fn(Arc<TimerEntry>)) {
        let drained = std::mem::take(&mut *self.timers.lock().unwrap());
        self.set_expiration(-1);
        for entry in drained {
            if !entry.is_stopped() {
                reinsert(entry);
            }
        }
    }
}
