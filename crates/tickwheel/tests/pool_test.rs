//! Pool fairness: every wheel in a round-robin pool must deliver on time.

use std::thread;
use std::time::{Duration, Instant};

use tickwheel::{TimingWheelPool, WheelConfig};

#[test]
fn pool_delivers_on_every_wheel() {
    let pool = TimingWheelPool::new(
        3,
        WheelConfig::new(Duration::from_millis(1), 50).worker_threads(2),
    );
    pool.start();

    let start = Instant::now();
    let receivers: Vec<_> = (0..60)
        .map(|_| pool.get().after(Duration::from_millis(200)))
        .collect();

    thread::scope(|s| {
        for rx in &receivers {
            s.spawn(move || {
                let fired_at = rx
                    .recv_timeout(Duration::from_secs(3))
                    .expect("pool timer did not fire");
                assert!(fired_at - start > Duration::from_millis(180));
            });
        }
    });

    pool.stop();
}

#[test]
fn pool_stop_is_a_full_fanout() {
    let pool = TimingWheelPool::new(
        2,
        WheelConfig::new(Duration::from_millis(1), 50).worker_threads(2),
    );
    pool.start();

    let pending: Vec<_> = (0..4)
        .map(|_| pool.get().after(Duration::from_millis(300)))
        .collect();

    pool.stop();

    for rx in pending {
        assert!(
            rx.recv_timeout(Duration::from_millis(600)).is_err(),
            "timer fired after pool shutdown"
        );
    }
}
