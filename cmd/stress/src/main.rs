//! High-volume insert/cancel stress demo
//!
//! Preloads the wheel with a large timer population, then measures
//! insert-then-cancel throughput from one producer thread per core.
//!
//! Usage: stress [preload] [rounds-per-producer]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tickwheel::{TimingWheel, WheelConfig};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let preload: usize = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1_000_000);
    let rounds: usize = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(200_000);
    let producers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);

    println!("=== tickwheel stress ===");
    println!(
        "preload={} rounds={} producers={}\n",
        preload, rounds, producers
    );

    let wheel = Arc::new(TimingWheel::new(WheelConfig::new(
        Duration::from_millis(1),
        50,
    )));
    wheel.start();

    let t0 = Instant::now();
    for i in 0..preload {
        wheel.add_task(Duration::from_millis((i % 10_000 + 1) as u64), || {});
    }
    let elapsed = t0.elapsed();
    println!(
        "preloaded {} timers in {:?} ({:.0} inserts/s)",
        preload,
        elapsed,
        preload as f64 / elapsed.as_secs_f64()
    );

    let cancelled = Arc::new(AtomicUsize::new(0));
    let t1 = Instant::now();
    let handles: Vec<_> = (0..producers)
        .map(|_| {
            let wheel = wheel.clone();
            let cancelled = cancelled.clone();
            thread::spawn(move || {
                for _ in 0..rounds {
                    if wheel.add_task(Duration::from_secs(1), || {}).stop() {
                        cancelled.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    let elapsed = t1.elapsed();
    let total = producers * rounds;
    println!(
        "insert+cancel {} rounds in {:?} ({:.0} rounds/s, {} cancelled in time)",
        total,
        elapsed,
        total as f64 / elapsed.as_secs_f64(),
        cancelled.load(Ordering::Relaxed)
    );

    wheel.stop();
}
