//! Ripple - inter-thread messaging on a pre-allocated ring buffer.
//!
//! Producers claim sequences, write into the slot and publish; consumers wait
//! on a barrier and process in batches. Consumer sequences gate the producer so
//! a slot is never overwritten before every consumer is done with it.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ripple::{ processor, BatchEventProcessor, BlockingWaitStrategy, EventProcessor, RingBuffer };
//!
//! let ring = Arc::new(RingBuffer::create_single_producer(|| 0u64, 1024, Arc::new(BlockingWaitStrategy::new()))?);
//! let consumer = Arc::new(BatchEventProcessor::new(ring.clone(), ring.new_barrier(&[]), MyHandler));
//! ring.add_gating_sequences(&[consumer.sequence()]);
//! let handle = processor::start(&consumer)?;
//!
//! ring.publish_event(|slot, seq| *slot = seq as u64);
//! ```

pub mod affinity;
pub mod constants;
pub mod disruptor;
pub mod error;
pub mod insights;
pub mod metrics;

pub use disruptor::processor;
pub use disruptor::{
    BatchEventProcessor,
    BlockingWaitStrategy,
    BusySpinWaitStrategy,
    EventHandler,
    EventProcessor,
    EventReleaser,
    ExceptionHandler,
    Executor,
    IgnoreExceptionHandler,
    LiteTimeoutBlockingWaitStrategy,
    LoggingExceptionHandler,
    ProducerType,
    RingBuffer,
    RingBufferConfig,
    Sequence,
    SequenceBarrier,
    SleepingWaitStrategy,
    ThreadExecutor,
    TimeoutBlockingWaitStrategy,
    WaitResult,
    WaitStrategy,
    WaitStrategyType,
    WorkHandler,
    WorkProcessor,
    WorkerPool,
    YieldingWaitStrategy,
};
pub use error::{ Result, RippleError };
pub use insights::init_tracy;
pub use metrics::{ Metrics, MetricsSnapshot };
