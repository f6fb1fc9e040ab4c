//! One-shot timer primitives over the wheel

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::entry::{Callback, TimerHandle};
use crate::wheel::{Core, TimingWheel};

/// One-shot timer: delivers one signal on [`Timer::c`] at its deadline.
///
/// Obtained from [`TimingWheel::timer`] or [`TimingWheel::after_func`].
pub struct Timer {
    c: Receiver<()>,
    tx: Sender<()>,
    f: Option<Callback>,
    core: Arc<Core>,
    handle: Mutex<TimerHandle>,
}

impl TimingWheel {
    /// One-shot timer firing after `delay`.
    pub fn timer(&self, delay: Duration) -> Timer {
        let (tx, c) = bounded(1);
        let sender = tx.clone();
        let handle = self.add_task(delay, move || {
            let _ = sender.try_send(());
        });
        Timer {
            c,
            tx,
            f: None,
            core: self.core.clone(),
            handle: Mutex::new(handle),
        }
    }

    /// One-shot timer that runs `f` before signalling.
    pub fn after_func<F>(&self, delay: Duration, f: F) -> Timer
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (tx, c) = bounded(1);
        let f: Callback = Arc::new(f);
        let task = signal_task(f.clone(), tx.clone());
        let handle = self.core.add_task(delay, task);
        Timer {
            c,
            tx,
            f: Some(f),
            core: self.core.clone(),
            handle: Mutex::new(handle),
        }
    }

    /// Channel delivering the firing instant once `delay` has elapsed.
    pub fn after(&self, delay: Duration) -> Receiver<Instant> {
        let (tx, rx) = bounded(1);
        self.add_task(delay, move || {
            let _ = tx.try_send(Instant::now());
        });
        rx
    }

    /// Block the calling thread for `delay`, timed by the wheel.
    pub fn sleep(&self, delay: Duration) {
        let (tx, rx) = bounded::<()>(1);
        self.add_task(delay, move || {
            let _ = tx.try_send(());
        });
        let _ = rx.recv();
    }
}

impl Timer {
    /// Signal channel; holds at most one message per arm.
    pub fn c(&self) -> &Receiver<()> {
        &self.c
    }

    /// Cancel the pending fire. True iff it was cancelled before the
    /// callback began.
    pub fn stop(&self) -> bool {
        self.handle.lock().unwrap().stop()
    }

    /// Re-arm with a new delay.
    ///
    /// As with the standard library timer, callers should stop the timer
    /// and drain [`Timer::c`] before resetting, or a stale signal may be
    /// observed.
    pub fn reset(&self, delay: Duration) {
        let task: Callback = match &self.f {
            Some(f) => signal_task(f.clone(), self.tx.clone()),
            None => {
                let tx = self.tx.clone();
                Arc::new(move || {
                    let _ = tx.try_send(());
                })
            }
        };
        *self.handle.lock().unwrap() = self.core.add_task(delay, task);
    }
}

fn signal_task(f: Callback, tx: Sender<()>) -> Callback {
    Arc::new(move || {
        f();
        let _ = tx.try_send(());
    })
}
