//! Hierarchical timing wheel and its dispatcher
//!
//! # Architecture
//!
//! ```text
//!   producers ──add_task/schedule_task──► Wheel.add ──► Bucket
//!                                            │            │ stamp changed
//!                                            ▼            ▼
//!                                      overflow Wheel   DelayQueue.offer
//!                                                         │
//!   tickwheel-poll ──DelayQueue.poll──► ready buckets ────┘
//!                                            │
//!   tickwheel-dispatch ── advance_clock ── Bucket.flush ──► re-add or run
//!                                                               │
//!                                              WorkerGroup ◄────┘
//! ```
//!
//! A single delay queue and a single overflow chain are shared across the
//! hierarchy. Each flushed overflow bucket re-adds its timers, which lands
//! them in lower wheels whose clocks have advanced far enough; timers
//! within one tick of now run immediately.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use tracing::{debug, warn};

use tickwheel_core::clock;
use tickwheel_core::delay_queue::DelayQueue;
use tickwheel_core::worker_group::{WaitGroup, WorkerGroup};

use crate::bucket::Bucket;
use crate::config::WheelConfig;
use crate::entry::{Callback, TimerEntry, TimerHandle};
use crate::schedule::Schedule;

/// Ceiling on graceful shutdown; a safety valve against stuck callbacks.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(8);

/// One level of the hierarchy.
struct Wheel {
    tick: i64,
    slot_count: i64,
    interval: i64,
    cur_time: AtomicI64,
    slots: Box<[Arc<Bucket>]>,
    queue: Arc<DelayQueue<Arc<Bucket>>>,
    overflow: OnceLock<Arc<Wheel>>,
}

impl Wheel {
    fn new(tick: i64, slot_count: i64, start: i64, queue: Arc<DelayQueue<Arc<Bucket>>>) -> Self {
        let slots: Vec<Arc<Bucket>> = (0..slot_count).map(|_| Arc::new(Bucket::new())).collect();
        Self {
            tick,
            slot_count,
            interval: tick * slot_count,
            cur_time: AtomicI64::new(start),
            slots: slots.into_boxed_slice(),
            queue,
            overflow: OnceLock::new(),
        }
    }

    /// Place `entry` in this wheel or its overflow chain.
    ///
    /// False means the deadline is within one tick of now; the caller must
    /// run the entry instead of enqueueing it.
    fn add(&self, entry: &Arc<TimerEntry>) -> bool {
        let cur_time = self.cur_time.load(Ordering::SeqCst);
        let expiration = entry.expiration();

        if expiration < cur_time + self.tick {
            false
        } else if expiration < cur_time + self.interval {
            let virtual_id = expiration / self.tick;
            let bucket = &self.slots[(virtual_id % self.slot_count) as usize];
            bucket.add(entry.clone());

            if bucket.set_expiration(virtual_id * self.tick) {
                self.queue.offer(bucket.clone(), virtual_id * self.tick);
            }
            true
        } else {
            let overflow = self.overflow.get_or_init(|| {
                Arc::new(Wheel::new(
                    self.interval,
                    self.slot_count,
                    cur_time,
                    self.queue.clone(),
                ))
            });
            overflow.add(entry)
        }
    }

    /// Move the clock forward to the flushed bucket's quantum, truncated to
    /// this wheel's tick, and cascade into the overflow chain.
    fn advance_clock(&self, expiration: i64) {
        let cur_time = self.cur_time.load(Ordering::SeqCst);
        if expiration >= cur_time + self.tick {
            let cur_time = truncate(expiration, self.tick);
            self.cur_time.store(cur_time, Ordering::SeqCst);

            if let Some(overflow) = self.overflow.get() {
                overflow.advance_clock(cur_time);
            }
        }
    }
}

/// Truncate `x` toward zero to a multiple of `m`.
fn truncate(x: i64, m: i64) -> i64 {
    if m <= 0 {
        x
    } else {
        x - x % m
    }
}

/// The machine behind a [`TimingWheel`]: base wheel, delay queue, workers.
pub(crate) struct Core {
    tick: i64,
    wheel: Wheel,
    queue: Arc<DelayQueue<Arc<Bucket>>>,
    workers: WorkerGroup,
    wait: WaitGroup,

    /// Handed to worker closures so a recurring re-arm cannot keep the
    /// machine alive past its owner.
    self_ref: Weak<Core>,
}

impl Core {
    fn new(config: &WheelConfig) -> Arc<Self> {
        let tick = config.tick.as_nanos() as i64;
        let queue = Arc::new(DelayQueue::new(config.slot_count, config.tick));
        let wait = WaitGroup::new();
        Arc::new_cyclic(|self_ref| Self {
            tick,
            wheel: Wheel::new(
                tick,
                config.slot_count as i64,
                truncate(clock::now_ns(), tick),
                queue.clone(),
            ),
            queue: queue.clone(),
            workers: WorkerGroup::new(config.worker_threads, wait.clone()),
            wait,
            self_ref: self_ref.clone(),
        })
    }

    pub(crate) fn add_task(&self, delay: Duration, task: Callback) -> TimerHandle {
        // A zero delay is normalised to one tick; Duration is unsigned so
        // nothing below zero can reach us.
        let delay = if delay.is_zero() {
            Duration::from_nanos(self.tick as u64)
        } else {
            delay
        };
        let entry = Arc::new(TimerEntry::once(
            clock::now_ns() + delay.as_nanos() as i64,
            task,
        ));
        self.add_or_run(entry.clone());
        TimerHandle::new(entry)
    }

    pub(crate) fn schedule_task(
        &self,
        schedule: Arc<dyn Schedule>,
        task: Callback,
    ) -> TimerHandle {
        match schedule.next(clock::now_ns()) {
            None => TimerHandle::new(Arc::new(TimerEntry::inert())),
            Some(expiration) => {
                let entry = Arc::new(TimerEntry::recurring(expiration, task, schedule));
                self.add_or_run(entry.clone());
                TimerHandle::new(entry)
            }
        }
    }

    /// Enqueue the entry, or run it now when its deadline is within one
    /// tick.
    fn add_or_run(&self, entry: Arc<TimerEntry>) {
        if !self.wheel.add(&entry) {
            self.run(entry);
        }
    }

    /// Dispatch the callback to the worker group. Recurring entries re-arm
    /// themselves once the callback returns, unless stopped meanwhile.
    fn run(&self, entry: Arc<TimerEntry>) {
        if !entry.begin_run() {
            return;
        }
        let core = self.self_ref.clone();
        self.workers.execute(move || {
            entry.invoke();

            if let Some(schedule) = entry.schedule() {
                if let Some(next) = schedule.next(clock::now_ns()) {
                    // reset_state loses against a concurrent stop, which is
                    // exactly when the entry must not be re-armed.
                    if entry.reset_state() {
                        entry.set_expiration(next);
                        if let Some(core) = core.upgrade() {
                            core.add_or_run(entry.clone());
                        }
                    }
                }
            }
        });
    }

    /// Drain ready buckets until `cancel` closes.
    fn dispatch(&self, cancel: Receiver<()>) {
        let ready = self.queue.receiver();
        loop {
            select! {
                recv(ready) -> msg => {
                    let Ok(bucket) = msg else { return };
                    self.wheel.advance_clock(bucket.expiration());
                    bucket.flush(|entry| self.add_or_run(entry));
                }
                recv(cancel) -> _ => return,
            }
        }
    }
}

/// Hierarchical timing-wheel scheduler.
///
/// Millions of outstanding timers insert and cancel in amortised constant
/// time; one poller thread and one dispatcher thread advance the clock,
/// and callbacks run on a worker pool so they can never stall dispatch.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use tickwheel::{TimingWheel, WheelConfig};
///
/// let wheel = TimingWheel::new(WheelConfig::new(Duration::from_millis(1), 50));
/// wheel.start();
///
/// let handle = wheel.add_task(Duration::from_secs(1), || println!("fired"));
/// handle.stop();
///
/// wheel.stop();
/// ```
pub struct TimingWheel {
    pub(crate) core: Arc<Core>,
    exit: Mutex<Option<Sender<()>>>,
    started: AtomicBool,
}

impl TimingWheel {
    /// Build a wheel from `config`.
    ///
    /// # Panics
    ///
    /// Panics when the configuration is invalid (tick below 1 ms or zero
    /// slots); see [`WheelConfig::validate`].
    pub fn new(config: WheelConfig) -> Self {
        if let Err(msg) = config.validate() {
            panic!("{}", msg);
        }
        Self {
            core: Core::new(&config),
            exit: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// Begin dispatch: spawns the poller and dispatcher threads.
    ///
    /// Idempotent; calls after the first are no-ops. A stopped wheel stays
    /// stopped.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let (exit_tx, exit_rx) = bounded::<()>(0);
        *self.exit.lock().unwrap() = Some(exit_tx);

        let core = self.core.clone();
        let cancel = exit_rx.clone();
        self.core.wait.wrap_thread("tickwheel-poll", move || {
            core.queue.poll(&cancel, clock::now_ns);
        });

        let core = self.core.clone();
        self.core.wait.wrap_thread("tickwheel-dispatch", move || {
            core.dispatch(exit_rx);
        });

        debug!(tick_ns = self.core.tick, "timing wheel started");
    }

    /// Graceful shutdown: stops dispatch and waits up to 8 seconds for the
    /// service threads and in-flight callbacks to drain.
    ///
    /// Callbacks still running past the ceiling are considered non-critical
    /// and surfaced as a warning.
    pub fn stop(&self) {
        let exit = self.exit.lock().unwrap().take();
        if exit.is_none() {
            return;
        }
        // Dropping the sender closes the channel, cancelling the poller and
        // dispatcher.
        drop(exit);

        if !self.core.wait.wait_timeout(SHUTDOWN_TIMEOUT) {
            warn!(
                in_flight = self.core.wait.count(),
                "shutdown timed out with callbacks still in flight"
            );
        }
        debug!("timing wheel stopped");
    }

    /// Register `task` to run once, `delay` after now.
    ///
    /// A zero delay is treated as one tick. Deadlines within one tick of
    /// now run immediately rather than being enqueued.
    pub fn add_task<F>(&self, delay: Duration, task: F) -> TimerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.core.add_task(delay, Arc::new(task))
    }

    /// Register `task` to run at every instant `schedule` yields.
    ///
    /// A schedule that is exhausted on arrival returns an inert handle
    /// whose `stop` reports false.
    pub fn schedule_task<S, F>(&self, schedule: S, task: F) -> TimerHandle
    where
        S: Schedule + 'static,
        F: Fn() + Send + Sync + 'static,
    {
        self.core.schedule_task(Arc::new(schedule), Arc::new(task))
    }

    /// Outstanding bucket registrations in the delay queue (diagnostics).
    pub fn pending(&self) -> usize {
        self.core.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate(1050, 100), 1000);
        assert_eq!(truncate(1000, 100), 1000);
        assert_eq!(truncate(99, 100), 0);
        assert_eq!(truncate(42, 0), 42);
    }

    #[test]
    #[should_panic(expected = "tick must be greater than or equal to 1ms")]
    fn test_sub_millisecond_tick_panics() {
        TimingWheel::new(WheelConfig::new(Duration::from_micros(100), 50));
    }

    #[test]
    #[should_panic(expected = "slot_count must be at least 1")]
    fn test_zero_slots_panics() {
        TimingWheel::new(WheelConfig::new(Duration::from_millis(1), 0));
    }

    #[test]
    fn test_start_is_idempotent() {
        let wheel = TimingWheel::new(WheelConfig::new(Duration::from_millis(1), 50));
        wheel.start();
        wheel.start();
        wheel.start();

        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        wheel.add_task(Duration::from_millis(20), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(300));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        wheel.stop();
    }

    #[test]
    fn test_stop_is_idempotent() {
        let wheel = TimingWheel::new(WheelConfig::new(Duration::from_millis(1), 50));
        wheel.start();
        wheel.stop();
        wheel.stop();
    }

    #[test]
    fn test_stop_before_start() {
        let wheel = TimingWheel::new(WheelConfig::new(Duration::from_millis(1), 50));
        wheel.stop();
    }

    #[test]
    fn test_far_deadline_lands_in_overflow() {
        let wheel = TimingWheel::new(WheelConfig::new(Duration::from_millis(1), 4));
        // Base span is 4 ms; this deadline needs two overflow levels.
        let handle = wheel.add_task(Duration::from_millis(100), || {});
        assert!(wheel.core.wheel.overflow.get().is_some());
        assert!(handle.stop());
    }

    #[test]
    fn test_overflow_entry_cascades_down_and_fires() {
        let wheel = TimingWheel::new(WheelConfig::new(Duration::from_millis(1), 4));
        wheel.start();

        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        // Beyond the 4 ms base span: must cascade through the overflow
        // chain before firing.
        wheel.add_task(Duration::from_millis(60), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(500));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        wheel.stop();
    }

    #[test]
    fn test_exhausted_schedule_yields_inert_handle() {
        let wheel = TimingWheel::new(WheelConfig::new(Duration::from_millis(1), 50));
        let handle = wheel.schedule_task(crate::schedule::Times::new(Duration::from_millis(10), 0), || {
            panic!("must never run");
        });
        assert!(!handle.stop());
    }
}
