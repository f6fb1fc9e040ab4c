//! Round-robin pool of independent wheels

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::WheelConfig;
use crate::wheel::TimingWheel;

/// Fixed array of identically-configured wheels.
///
/// Each wheel has its own delay queue, dispatcher and workers; `get`
/// dispenses them round-robin to shard producer contention on the enqueue
/// path.
pub struct TimingWheelPool {
    wheels: Box<[TimingWheel]>,
    incr: AtomicUsize,
}

impl TimingWheelPool {
    /// Build `size` wheels from `config`.
    ///
    /// # Panics
    ///
    /// Panics when `size` is zero or the wheel config is invalid.
    pub fn new(size: usize, config: WheelConfig) -> Self {
        assert!(size > 0, "pool size must be at least 1");
        let wheels: Vec<TimingWheel> = (0..size)
            .map(|_| TimingWheel::new(config.clone()))
            .collect();
        Self {
            wheels: wheels.into_boxed_slice(),
            incr: AtomicUsize::new(0),
        }
    }

    /// Start every wheel in the pool.
    pub fn start(&self) {
        for wheel in self.wheels.iter() {
            wheel.start();
        }
    }

    /// Stop every wheel in the pool.
    pub fn stop(&self) {
        for wheel in self.wheels.iter() {
            wheel.stop();
        }
    }

    /// Next wheel, round-robin.
    pub fn get(&self) -> &TimingWheel {
        let index = self.incr.fetch_add(1, Ordering::Relaxed);
        &self.wheels[index % self.wheels.len()]
    }

    /// Number of wheels in the pool.
    pub fn len(&self) -> usize {
        self.wheels.len()
    }

    /// A pool is never empty; present for container-API symmetry.
    pub fn is_empty(&self) -> bool {
        self.wheels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    #[test]
    #[should_panic(expected = "pool size must be at least 1")]
    fn test_zero_size_panics() {
        TimingWheelPool::new(0, WheelConfig::default());
    }

    #[test]
    fn test_get_cycles_through_wheels() {
        let pool = TimingWheelPool::new(3, WheelConfig::new(Duration::from_millis(1), 8));
        assert_eq!(pool.len(), 3);

        let mut seen = HashSet::new();
        for _ in 0..3 {
            seen.insert(pool.get() as *const TimingWheel);
        }
        assert_eq!(seen.len(), 3);

        // The fourth call wraps around.
        let first_again = pool.get() as *const TimingWheel;
        assert!(seen.contains(&first_again));
    }
}
