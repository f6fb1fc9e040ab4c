//! Repeating ticker primitive over the wheel

use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender};

use crate::entry::TimerHandle;
use crate::schedule::Every;
use crate::wheel::TimingWheel;

/// Repeating signal every interval until stopped.
///
/// The tick callback blocks on the consumer (or the ticker's own stop
/// signal), so a slow consumer delays subsequent ticks instead of piling
/// them up.
pub struct Ticker {
    c: Receiver<()>,
    stop_tx: Mutex<Option<Sender<()>>>,
    handle: TimerHandle,
}

impl TimingWheel {
    /// Repeating ticker signalling every `interval`.
    pub fn ticker(&self, interval: Duration) -> Ticker {
        let (tx, c) = bounded::<()>(0);
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let handle = self.schedule_task(Every(interval), move || {
            select! {
                send(tx, ()) -> _ => {}
                recv(stop_rx) -> _ => {}
            }
        });
        Ticker {
            c,
            stop_tx: Mutex::new(Some(stop_tx)),
            handle,
        }
    }
}

impl Ticker {
    /// Signal channel; one rendezvous per tick.
    pub fn c(&self) -> &Receiver<()> {
        &self.c
    }

    /// Stop the ticker. No signal is delivered afterwards; a tick blocked
    /// on a departed consumer is released.
    pub fn stop(&self) {
        self.handle.stop();
        // Closing the stop channel releases a tick blocked in its send.
        self.stop_tx.lock().unwrap().take();
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
