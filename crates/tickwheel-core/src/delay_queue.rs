//! Timer-gated delay queue
//!
//! Wraps the priority queue with time-based readiness: producers `offer`
//! elements keyed by an absolute expiration, a single consumer runs
//! [`DelayQueue::poll`] on its own thread and hands each element over on
//! the output channel once its time has come.
//!
//! Priorities are quanta: expiration nanoseconds divided by `precision`.
//!
//! # Consumer contract
//!
//! At most one thread may call `poll`. Any number of threads may `offer`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender};

use crate::priority_queue::PriorityQueue;

pub struct DelayQueue<T> {
    pq: Mutex<PriorityQueue<T>>,

    /// Set while the consumer is blocked waiting for a wakeup. Producers
    /// CAS it back to false before signalling, so at most one wakeup is
    /// ever in flight.
    sleeping: AtomicBool,

    /// Zero-capacity rendezvous: a producer that wins the sleeping CAS is
    /// committed to completing exactly one send.
    wakeup_tx: Sender<()>,
    wakeup_rx: Receiver<()>,

    out_tx: Sender<T>,
    out_rx: Receiver<T>,

    precision: i64,
}

impl<T: Send> DelayQueue<T> {
    /// `capacity` bounds the output channel and seeds the heap;
    /// `precision` is the quantum priorities are expressed in.
    pub fn new(capacity: usize, precision: Duration) -> Self {
        let (wakeup_tx, wakeup_rx) = bounded(0);
        let (out_tx, out_rx) = bounded(capacity);
        Self {
            pq: Mutex::new(PriorityQueue::with_capacity(capacity)),
            sleeping: AtomicBool::new(false),
            wakeup_tx,
            wakeup_rx,
            out_tx,
            out_rx,
            precision: precision.as_nanos() as i64,
        }
    }

    /// Receiver for elements whose time has come.
    pub fn receiver(&self) -> Receiver<T> {
        self.out_rx.clone()
    }

    /// Number of queued (not yet emitted) elements.
    pub fn len(&self) -> usize {
        self.pq.lock().unwrap().len()
    }

    /// Check if no elements are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert an element keyed by absolute expiration (nanoseconds since
    /// the clock epoch). Wakes the consumer iff the insertion became the
    /// new head while the consumer sleeps.
    pub fn offer(&self, value: T, expiration_ns: i64) {
        let index = {
            let mut pq = self.pq.lock().unwrap();
            pq.add(value, expiration_ns / self.precision)
        };

        if index == 0
            && self
                .sleeping
                .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            let _ = self.wakeup_tx.send(());
        }
    }

    /// Single-consumer loop: emits ready elements on [`receiver`] until
    /// `cancel` closes. `now_fn` supplies nanoseconds since the clock
    /// epoch.
    ///
    /// [`receiver`]: DelayQueue::receiver
    pub fn poll(&self, cancel: &Receiver<()>, now_fn: impl Fn() -> i64) {
        loop {
            let now = now_fn() / self.precision;

            let (elem, head) = {
                let mut pq = self.pq.lock().unwrap();
                let (elem, head) = pq.priority_shift(now);
                if elem.is_none() {
                    // Must happen before the mutex is released: an offer
                    // that has not yet inserted could read sleeping==false,
                    // skip its wakeup, and leave the consumer blocked past
                    // the new head's deadline.
                    self.sleeping.store(true, Ordering::SeqCst);
                }
                (elem, head)
            };

            let elem = match elem {
                Some(elem) => elem,
                None if head == 0 => {
                    // Empty queue: block until an offer arrives.
                    select! {
                        recv(self.wakeup_rx) -> _ => continue,
                        recv(cancel) -> _ => {
                            self.drain_wakeup();
                            return;
                        }
                    }
                }
                None => {
                    // Head not ready: block until its quantum, a new head,
                    // or cancellation.
                    let timeout =
                        Duration::from_nanos(((head - now) * self.precision) as u64);
                    select! {
                        recv(self.wakeup_rx) -> _ => continue,
                        recv(cancel) -> _ => {
                            self.drain_wakeup();
                            return;
                        }
                        default(timeout) => {
                            self.drain_wakeup();
                            continue;
                        }
                    }
                }
            };

            select! {
                send(self.out_tx, elem) -> _ => {}
                recv(cancel) -> _ => return,
            }
        }
    }

    /// Preserve the one-pending-signal invariant on timeout or cancel: if
    /// `sleeping` is already false, a producer won the CAS and is committed
    /// to sending, so take its wakeup here.
    fn drain_wakeup(&self) {
        if !self.sleeping.swap(false, Ordering::SeqCst) {
            let _ = self.wakeup_rx.recv();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock;
    use std::sync::Arc;
    use std::thread;

    fn spawn_poller(queue: &Arc<DelayQueue<i64>>) -> (Sender<()>, thread::JoinHandle<()>) {
        let (cancel_tx, cancel_rx) = bounded::<()>(0);
        let q = queue.clone();
        let handle = thread::spawn(move || q.poll(&cancel_rx, clock::now_ns));
        (cancel_tx, handle)
    }

    #[test]
    fn test_emits_in_deadline_order() {
        let queue = Arc::new(DelayQueue::new(16, Duration::from_millis(1)));
        let (cancel_tx, handle) = spawn_poller(&queue);

        let now = clock::now_ns();
        // Offer in reverse deadline order.
        for i in (0..50i64).rev() {
            queue.offer(i, now + (i + 1) * 10_000_000);
        }

        let rx = queue.receiver();
        for expect in 0..50i64 {
            let got = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            assert_eq!(got, expect);
        }

        drop(cancel_tx);
        handle.join().unwrap();
    }

    #[test]
    fn test_new_head_wakes_sleeping_consumer() {
        let queue = Arc::new(DelayQueue::new(16, Duration::from_millis(1)));
        let (cancel_tx, handle) = spawn_poller(&queue);

        let now = clock::now_ns();
        // Park the consumer on a far-future head, then preempt it.
        queue.offer(2, now + 60_000_000_000);
        thread::sleep(Duration::from_millis(50));
        queue.offer(1, now + 20_000_000);

        let got = queue
            .receiver()
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        assert_eq!(got, 1);

        drop(cancel_tx);
        handle.join().unwrap();
    }

    #[test]
    fn test_concurrent_offers() {
        let queue = Arc::new(DelayQueue::new(16, Duration::from_millis(1)));
        let (cancel_tx, handle) = spawn_poller(&queue);

        let now = clock::now_ns();
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let q = queue.clone();
                thread::spawn(move || {
                    for i in 0..25i64 {
                        let key = p * 25 + i;
                        q.offer(key, now + (key + 1) * 5_000_000);
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }

        let rx = queue.receiver();
        let mut seen = Vec::new();
        for _ in 0..100 {
            seen.push(rx.recv_timeout(Duration::from_secs(2)).unwrap());
        }
        // Deadlines were distinct, so emission order is deadline order.
        let mut expect = seen.clone();
        expect.sort_unstable();
        assert_eq!(seen, expect);

        drop(cancel_tx);
        handle.join().unwrap();
    }

    #[test]
    fn test_cancel_unblocks_consumer() {
        let queue: Arc<DelayQueue<i64>> = Arc::new(DelayQueue::new(4, Duration::from_millis(1)));
        let (cancel_tx, handle) = spawn_poller(&queue);

        thread::sleep(Duration::from_millis(20));
        drop(cancel_tx);
        handle.join().unwrap();

        // Offers after shutdown must not block the producer.
        queue.offer(1, clock::now_ns());
        queue.offer(2, clock::now_ns());
        assert_eq!(queue.len(), 2);
    }
}
