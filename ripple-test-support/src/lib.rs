//! # ripple-test-support
//!
//! Testing infrastructure for ripple.
//!
//! ## Components
//!
//! - **StressRunner** - Duration-bounded pipeline runs with progress reporting
//! - **SequenceChecker** - In-order, gap-free, duplicate-free delivery to one consumer
//! - **DeliveryLedger** - Exactly-once delivery across a worker pool
//! - **ObservingHandler** - Ships deliveries out of processor threads over a channel

pub mod observe;
pub mod stress;
pub mod verify;

pub use observe::{ observation_channel, Observation, ObservingHandler };
pub use stress::{ print_summary, Jitter, StressConfig, StressCounters, StressMetrics, StressRunner };
pub use verify::{ DeliveryLedger, SequenceChecker, SequenceStats, SequenceStatus };
