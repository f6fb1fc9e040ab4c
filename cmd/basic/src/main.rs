//! Basic tickwheel example
//!
//! Demonstrates the one-shot, recurring and convenience APIs.

use std::time::{Duration, Instant};

use tickwheel::{Times, TimingWheel, WheelConfig};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== tickwheel basic example ===\n");

    let wheel = TimingWheel::new(WheelConfig::new(Duration::from_millis(1), 50));
    wheel.start();

    let start = Instant::now();

    // One-shot timer
    let timer = wheel.timer(Duration::from_millis(200));
    timer.c().recv().unwrap();
    println!("timer fired after {:?}", start.elapsed());

    // Callback plus signal
    let t = wheel.after_func(Duration::from_millis(100), || {
        println!("after_func callback ran");
    });
    t.c().recv().unwrap();

    // Repeating ticker
    let ticker = wheel.ticker(Duration::from_millis(100));
    for i in 1..=5 {
        ticker.c().recv().unwrap();
        println!("tick {} at {:?}", i, start.elapsed());
    }
    ticker.stop();

    // Fixed-count schedule
    let (tx, rx) = std::sync::mpsc::channel();
    wheel.schedule_task(Times::new(Duration::from_millis(150), 3), move || {
        let _ = tx.send(Instant::now());
    });
    for fired_at in rx.iter() {
        println!("fixed-count fire at {:?}", fired_at - start);
    }

    // Sleep through the wheel
    wheel.sleep(Duration::from_millis(150));
    println!("slept, total {:?}", start.elapsed());

    wheel.stop();
    println!("\ndone");
}
