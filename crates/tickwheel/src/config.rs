//! Wheel configuration

use std::time::Duration;

/// Configuration for a timing wheel
#[derive(Debug, Clone)]
pub struct WheelConfig {
    /// Duration of one slot in the base wheel (minimum 1 ms).
    /// Smaller = finer resolution, more work per second.
    pub tick: Duration,

    /// Number of slots per wheel (at least 1). Governs the span of the
    /// base wheel; deadlines beyond `tick * slot_count` overflow into
    /// higher-order wheels.
    pub slot_count: usize,

    /// Worker threads for callback execution (0 = one per core).
    pub worker_threads: usize,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(1),
            slot_count: 512,
            worker_threads: 0,
        }
    }
}

impl WheelConfig {
    /// Create a configuration with the two parameters every wheel needs.
    pub fn new(tick: Duration, slot_count: usize) -> Self {
        Self {
            tick,
            slot_count,
            ..Default::default()
        }
    }

    /// Set the tick duration.
    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Set the slot count per wheel.
    pub fn slot_count(mut self, n: usize) -> Self {
        self.slot_count = n;
        self
    }

    /// Set the callback worker thread count (0 = one per core).
    pub fn worker_threads(mut self, n: usize) -> Self {
        self.worker_threads = n;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.tick < Duration::from_millis(1) {
            return Err("tick must be greater than or equal to 1ms");
        }
        if self.slot_count == 0 {
            return Err("slot_count must be at least 1");
        }
        Ok(())
    }
}
