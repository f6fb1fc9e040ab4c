//! # tickwheel-core
//!
//! Platform-agnostic plumbing shared by any wheel driver:
//! - Process-wide monotonic clock ([`clock`])
//! - Index-reporting binary min-heap ([`priority_queue`])
//! - Timer-gated delay queue ([`delay_queue`])
//! - Callback worker group with join-on-shutdown ([`worker_group`])

pub mod clock;
pub mod delay_queue;
pub mod priority_queue;
pub mod worker_group;

pub use delay_queue::DelayQueue;
pub use priority_queue::PriorityQueue;
pub use worker_group::{WaitGroup, WorkerGroup};
