//! Insert-then-cancel hot path, with the wheel preloaded to varying depth.
//!
//! Mirrors production usage where a large standing population of timeouts
//! is churned by short-lived ones.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tickwheel::{TimingWheel, WheelConfig};

fn varied_delay(i: usize) -> Duration {
    Duration::from_millis((i % 10_000) as u64 + 1)
}

fn bench_insert_cancel(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_cancel");
    group.throughput(Throughput::Elements(1));

    for preload in [10_000usize, 100_000, 1_000_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(preload),
            &preload,
            |b, &preload| {
                let wheel =
                    TimingWheel::new(WheelConfig::new(Duration::from_millis(1), 50));
                wheel.start();
                for i in 0..preload {
                    wheel.add_task(varied_delay(i), || {});
                }

                b.iter(|| {
                    wheel.add_task(Duration::from_secs(1), || {}).stop();
                });

                wheel.stop();
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_insert_cancel);
criterion_main!(benches);
