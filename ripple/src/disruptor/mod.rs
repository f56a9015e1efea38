//! Disruptor core: ring buffer, sequencers, barriers and processors.
//!
//! - `RingBuffer<T>` - pre-allocated slots plus a single- or multi-producer sequencer
//! - `SequenceBarrier` - consumer-side wait on the cursor and upstream consumers
//! - `WaitStrategy` - busy-spin, yielding, sleeping, blocking and timeout variants
//! - `BatchEventProcessor` - every event to one handler, in batches
//! - `WorkProcessor` / `WorkerPool` - each event to exactly one of K handlers

pub mod sequence;
pub mod alert;
pub mod wait_strategy;
pub mod barrier;
pub mod sequencer;
pub mod single;
pub mod multi;
pub mod ring_buffer;
pub mod handler;
pub mod exception_handler;
pub mod processor;
pub mod batch_processor;
pub mod work_processor;
pub mod worker_pool;

pub use sequence::{ minimum_sequence, DependentSequence, Sequence, SequenceGroup };
pub use alert::SequenceBarrierAlert;
pub use wait_strategy::{
    BlockingWaitStrategy,
    BusySpinWaitStrategy,
    LiteTimeoutBlockingWaitStrategy,
    SleepingWaitStrategy,
    TimeoutBlockingWaitStrategy,
    WaitResult,
    WaitStrategy,
    YieldingWaitStrategy,
};
pub use barrier::SequenceBarrier;
pub use sequencer::Sequencer;
pub use single::SingleProducerSequencer;
pub use multi::MultiProducerSequencer;
pub use ring_buffer::RingBuffer;
pub use handler::{ EventHandler, EventReleaser, WorkHandler };
pub use exception_handler::{ ExceptionHandler, IgnoreExceptionHandler, LoggingExceptionHandler };
pub use processor::{ start, start_on, EventProcessor, Executor, ThreadExecutor };
pub use batch_processor::BatchEventProcessor;
pub use work_processor::WorkProcessor;
pub use worker_pool::WorkerPool;

use std::sync::Arc;
use std::time::Duration;

use crate::constants::DEFAULT_RING_BUFFER_SIZE;
use crate::error::{ Result, RippleError };

/// Who may claim sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProducerType {
    /// Exactly one publishing thread
    #[default]
    Single,
    /// Any number of concurrent publishers
    Multi,
}

/// Wait strategy selection for configuration-driven construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitStrategyType {
    BusySpin,
    Yielding,
    Sleeping,
    #[default]
    Blocking,
    TimeoutBlocking(Duration),
    LiteTimeoutBlocking(Duration),
}

impl WaitStrategyType {
    pub fn build(&self) -> Arc<dyn WaitStrategy> {
        match *self {
            Self::BusySpin => Arc::new(BusySpinWaitStrategy::new()),
            Self::Yielding => Arc::new(YieldingWaitStrategy::new()),
            Self::Sleeping => Arc::new(SleepingWaitStrategy::default()),
            Self::Blocking => Arc::new(BlockingWaitStrategy::new()),
            Self::TimeoutBlocking(timeout) => Arc::new(TimeoutBlockingWaitStrategy::new(timeout)),
            Self::LiteTimeoutBlocking(timeout) =>
                Arc::new(LiteTimeoutBlockingWaitStrategy::new(timeout)),
        }
    }
}

/// Configuration for ring buffer behavior
#[derive(Debug, Clone)]
pub struct RingBufferConfig {
    /// Size of the ring buffer (must be power of 2)
    pub size: usize,
    pub producer_type: ProducerType,
    pub wait_strategy: WaitStrategyType,
}

impl Default for RingBufferConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_RING_BUFFER_SIZE,
            producer_type: ProducerType::default(),
            wait_strategy: WaitStrategyType::default(),
        }
    }
}

impl RingBufferConfig {
    /// Create a new configuration with the specified size
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(RippleError::config("Ring buffer size must be greater than 0"));
        }
        if !size.is_power_of_two() {
            return Err(RippleError::config("Ring buffer size must be power of 2"));
        }

        Ok(Self {
            size,
            ..Default::default()
        })
    }

    pub fn with_producer_type(mut self, producer_type: ProducerType) -> Self {
        self.producer_type = producer_type;
        self
    }

    pub fn with_wait_strategy(mut self, wait_strategy: WaitStrategyType) -> Self {
        self.wait_strategy = wait_strategy;
        self
    }
}
