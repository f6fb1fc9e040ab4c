//! Callback workers and shutdown accounting
//!
//! Timer callbacks must never run on the dispatcher thread: a slow or
//! blocking callback would stall the clock for every other timer. The
//! [`WorkerGroup`] hands each callback to a pool worker inside a panic
//! boundary, and the shared [`WaitGroup`] lets graceful shutdown wait
//! (with a ceiling) for service threads and in-flight callbacks alike.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::warn;

/// Counts in-flight work across threads.
///
/// Unlike joining handles, a count allows one bounded wait over a mix of
/// service threads and short-lived pool jobs.
#[derive(Clone, Default)]
pub struct WaitGroup {
    inner: Arc<WaitGroupInner>,
}

#[derive(Default)]
struct WaitGroupInner {
    count: Mutex<usize>,
    cond: Condvar,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `n` units of in-flight work.
    pub fn add(&self, n: usize) {
        *self.inner.count.lock().unwrap() += n;
    }

    /// Mark one unit of work finished.
    pub fn done(&self) {
        let mut count = self.inner.count.lock().unwrap();
        debug_assert!(*count > 0, "done() without matching add()");
        *count -= 1;
        if *count == 0 {
            self.inner.cond.notify_all();
        }
    }

    /// Current in-flight count.
    pub fn count(&self) -> usize {
        *self.inner.count.lock().unwrap()
    }

    /// Wait until the count reaches zero or `timeout` elapses.
    /// Returns true iff everything drained in time.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.inner.count.lock().unwrap();
        while *count > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .inner
                .cond
                .wait_timeout(count, deadline - now)
                .unwrap();
            count = guard;
        }
        true
    }

    /// Run `f` on a named OS thread tracked by this group.
    ///
    /// The handle is detached; completion is observed through the count.
    pub fn wrap_thread<F>(&self, name: &str, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.add(1);
        let guard = DoneGuard(self.clone());
        let _ = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _guard = guard;
                f();
            })
            .expect("failed to spawn thread");
    }
}

/// Decrements the group even when the tracked work panics.
struct DoneGuard(WaitGroup);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.0.done();
    }
}

/// Executes callbacks off the dispatcher thread.
pub struct WorkerGroup {
    pool: rayon::ThreadPool,
    wait: WaitGroup,
}

impl WorkerGroup {
    /// Build a pool of `threads` workers (0 sizes it to the machine),
    /// tracking each job in `wait`.
    pub fn new(threads: usize, wait: WaitGroup) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("tickwheel-worker-{}", i))
            .build()
            .expect("failed to build worker pool");
        Self { pool, wait }
    }

    /// The wait group jobs are tracked in.
    pub fn wait_group(&self) -> &WaitGroup {
        &self.wait
    }

    /// Run `task` on a pool worker.
    ///
    /// Panics are recorded and suppressed so a failing callback cannot
    /// take down the dispatcher or poison shutdown accounting.
    pub fn execute<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.wait.add(1);
        let guard = DoneGuard(self.wait.clone());
        self.pool.spawn(move || {
            let _guard = guard;
            if catch_unwind(AssertUnwindSafe(task)).is_err() {
                warn!("timer callback panicked");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_wait_group_drains() {
        let wg = WaitGroup::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..8 {
            let hits = hits.clone();
            wg.wrap_thread("wg-test", move || {
                thread::sleep(Duration::from_millis(10));
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert!(wg.wait_timeout(Duration::from_secs(5)));
        assert_eq!(hits.load(Ordering::SeqCst), 8);
        assert_eq!(wg.count(), 0);
    }

    #[test]
    fn test_wait_group_times_out() {
        let wg = WaitGroup::new();
        wg.wrap_thread("wg-slow", || thread::sleep(Duration::from_millis(300)));
        assert!(!wg.wait_timeout(Duration::from_millis(30)));
        assert!(wg.wait_timeout(Duration::from_secs(5)));
    }

    #[test]
    fn test_wait_timeout_empty_returns_immediately() {
        let wg = WaitGroup::new();
        let start = Instant::now();
        assert!(wg.wait_timeout(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_execute_runs_task() {
        let wg = WaitGroup::new();
        let workers = WorkerGroup::new(2, wg.clone());
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..16 {
            let hits = hits.clone();
            workers.execute(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert!(wg.wait_timeout(Duration::from_secs(5)));
        assert_eq!(hits.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn test_panicking_task_is_contained() {
        let wg = WaitGroup::new();
        let workers = WorkerGroup::new(1, wg.clone());
        workers.execute(|| panic!("boom"));

        // The pool survives and keeps accepting work.
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        workers.execute(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });

        assert!(wg.wait_timeout(Duration::from_secs(5)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
