//! # tickwheel
//!
//! Hierarchical timing-wheel scheduler for deferred callbacks.
//!
//! A [`TimingWheel`] owns an array of buckets indexed by time quantum,
//! chained to higher-order wheels for deadlines beyond its span. Inserting
//! or cancelling a timer is an amortised constant-time operation, so the
//! wheel stays cheap with millions of timers outstanding; a delay queue of
//! bucket expirations drives a single dispatcher that advances the clock
//! and flushes ready buckets to a callback worker pool.
//!
//! - [`TimingWheel::add_task`] runs a callback once after a delay.
//! - [`TimingWheel::schedule_task`] runs it at every instant a [`Schedule`]
//!   yields ([`Every`] for fixed intervals, [`Times`] for fixed counts).
//! - [`TimingWheel::timer`], [`TimingWheel::ticker`], [`TimingWheel::sleep`],
//!   [`TimingWheel::after`] and [`TimingWheel::after_func`] are channel-based
//!   convenience primitives over the two registration calls.
//! - [`TimingWheelPool`] shards producers round-robin over independent
//!   wheels.

mod bucket;
mod config;
mod entry;
mod pool;
mod schedule;
mod ticker;
mod timer;
mod wheel;

pub use config::WheelConfig;
pub use entry::TimerHandle;
pub use pool::TimingWheelPool;
pub use schedule::{Every, Schedule, Times};
pub use ticker::Ticker;
pub use timer::Timer;
pub use wheel::TimingWheel;
