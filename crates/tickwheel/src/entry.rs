//! Timer entries and cancellation handles

use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::Arc;

use crate::schedule::Schedule;

/// Waiting in a bucket, or not yet dispatched.
const IDLE: u8 = 0;
/// Cancelled before the callback began.
const STOPPED: u8 = 1;
/// Callback dispatched; terminal for one-shot entries.
const RUNNING: u8 = 2;

pub(crate) type Callback = Arc<dyn Fn() + Send + Sync>;

/// A scheduled task: absolute deadline, callback, atomic lifecycle state.
///
/// An entry is held by at most one bucket between a successful wheel
/// insert and that bucket's flush. Recurring entries carry the schedule
/// that yields each next deadline and are re-armed by the worker that ran
/// the callback, guarded by [`reset_state`](TimerEntry::reset_state).
pub(crate) struct TimerEntry {
    expiration: AtomicI64,
    state: AtomicU8,
    task: Callback,
    schedule: Option<Arc<dyn Schedule>>,
}

impl TimerEntry {
    /// One-shot entry due at `expiration` (ns since the clock epoch).
    pub(crate) fn once(expiration: i64, task: Callback) -> Self {
        Self {
            expiration: AtomicI64::new(expiration),
            state: AtomicU8::new(IDLE),
            task,
            schedule: None,
        }
    }

    /// Recurring entry; `schedule` yields every deadline after the first.
    pub(crate) fn recurring(
        expiration: i64,
        task: Callback,
        schedule: Arc<dyn Schedule>,
    ) -> Self {
        Self {
            expiration: AtomicI64::new(expiration),
            state: AtomicU8::new(IDLE),
            task,
            schedule: Some(schedule),
        }
    }

    /// Inert entry for schedules that are exhausted on arrival. Never
    /// enqueued; `stop` reports false.
    pub(crate) fn inert() -> Self {
        Self {
            expiration: AtomicI64::new(-1),
            state: AtomicU8::new(STOPPED),
            task: Arc::new(|| {}),
            schedule: None,
        }
    }

    #[inline]
    pub(crate) fn expiration(&self) -> i64 {
        self.expiration.load(Ordering::SeqCst)
    }

    #[inline]
    pub(crate) fn set_expiration(&self, ns: i64) {
        self.expiration.store(ns, Ordering::SeqCst);
    }

    pub(crate) fn schedule(&self) -> Option<&Arc<dyn Schedule>> {
        self.schedule.as_ref()
    }

    /// Invoke the callback on the current thread.
    pub(crate) fn invoke(&self) {
        let task: &(dyn Fn() + Send + Sync) = self.task.as_ref();
        task();
    }

    /// IDLE -> STOPPED. True iff this call cancelled the entry before its
    /// callback began; false means the callback already ran or will run.
    pub(crate) fn stop(&self) -> bool {
        self.state.swap(STOPPED, Ordering::SeqCst) == IDLE
    }

    /// IDLE -> RUNNING gate. The dispatcher only runs the callback when
    /// this succeeds, so a won `stop` race suppresses the run.
    pub(crate) fn begin_run(&self) -> bool {
        self.state
            .compare_exchange(IDLE, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// RUNNING -> IDLE, used only when a recurring entry re-arms. Fails if
    /// `stop` intervened while the callback ran.
    pub(crate) fn reset_state(&self) -> bool {
        self.state
            .compare_exchange(RUNNING, IDLE, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    #[inline]
    pub(crate) fn is_stopped(&self) -> bool {
        self.state.load(Ordering::SeqCst) == STOPPED
    }
}

/// Cancellation handle returned by task registration.
///
/// Cloneable; all clones refer to the same scheduled task.
#[derive(Clone)]
pub struct TimerHandle {
    entry: Arc<TimerEntry>,
}

impl TimerHandle {
    pub(crate) fn new(entry: Arc<TimerEntry>) -> Self {
        Self { entry }
    }

    /// Cancel the task. O(1), never blocks.
    ///
    /// Returns true iff the task was cancelled before its callback began;
    /// false means it is too late and the (current) invocation completes.
    /// For recurring tasks a false result still guarantees no further
    /// invocations are scheduled.
    pub fn stop(&self) -> bool {
        self.entry.stop()
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("expiration_ns", &self.entry.expiration())
            .field("stopped", &self.entry.is_stopped())
            .finish()
    }
}
