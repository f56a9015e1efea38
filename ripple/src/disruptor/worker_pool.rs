//! Pool of work processors sharing one barrier and one work sequence.

use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;

use crate::disruptor::exception_handler::{ ExceptionHandler, LoggingExceptionHandler };
use crate::disruptor::handler::WorkHandler;
use crate::disruptor::processor::{ self, EventProcessor, Executor };
use crate::disruptor::ring_buffer::RingBuffer;
use crate::disruptor::sequence::{ minimum_sequence, Sequence };
use crate::disruptor::work_processor::WorkProcessor;
use crate::error::{ Result, RippleError };

/// K competing consumers over one ring buffer.
///
/// Every member sequence and the shared work sequence are registered as
/// gating sequences when the pool is built, so the slowest member bounds the
/// producer.
pub struct WorkerPool<T> {
    ring_buffer: Arc<RingBuffer<T>>,
    work_sequence: Arc<Sequence>,
    processors: Vec<Arc<WorkProcessor<T>>>,
    started: AtomicBool,
}

impl<T: Send + Sync + 'static> WorkerPool<T> {
    /// One member per handler. `sequences_to_track` are upstream consumers the
    /// pool must stay behind (empty to consume straight off the cursor).
    pub fn new(
        ring_buffer: Arc<RingBuffer<T>>,
        sequences_to_track: &[Arc<Sequence>],
        handlers: Vec<Box<dyn WorkHandler<T>>>
    ) -> Result<Self> {
        Self::with_exception_handler(
            ring_buffer,
            sequences_to_track,
            handlers,
            Arc::new(LoggingExceptionHandler)
        )
    }

    pub fn with_exception_handler(
        ring_buffer: Arc<RingBuffer<T>>,
        sequences_to_track: &[Arc<Sequence>],
        handlers: Vec<Box<dyn WorkHandler<T>>>,
        exception_handler: Arc<dyn ExceptionHandler<T>>
    ) -> Result<Self> {
        if handlers.is_empty() {
            return Err(RippleError::config("WorkerPool needs at least one handler"));
        }

        let barrier = ring_buffer.new_barrier(sequences_to_track);
        let work_sequence = Arc::new(Sequence::default());

        let processors: Vec<_> = handlers
            .into_iter()
            .map(|handler| {
                Arc::new(
                    WorkProcessor::with_exception_handler(
                        ring_buffer.clone(),
                        barrier.clone(),
                        handler,
                        work_sequence.clone(),
                        exception_handler.clone()
                    )
                )
            })
            .collect();

        let pool = Self {
            ring_buffer,
            work_sequence,
            processors,
            started: AtomicBool::new(false),
        };
        pool.ring_buffer.add_gating_sequences(&pool.worker_sequences());
        Ok(pool)
    }

    /// Member sequences followed by the shared work sequence
    pub fn worker_sequences(&self) -> Vec<Arc<Sequence>> {
        self.processors
            .iter()
            .map(|p| p.sequence())
            .chain(std::iter::once(self.work_sequence.clone()))
            .collect()
    }

    pub fn size(&self) -> usize {
        self.processors.len()
    }

    /// Start every member on `executor`, consuming from the current cursor on.
    pub fn start(&self, executor: &dyn Executor) -> Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(RippleError::AlreadyRunning { processor: "WorkerPool" });
        }

        let cursor = self.ring_buffer.cursor();
        self.work_sequence.set(cursor);
        for p in &self.processors {
            p.sequence().set(cursor);
        }

        for p in &self.processors {
            processor::start_on(p, executor)?;
        }
        Ok(())
    }

    /// Wait until every published event has been handled, then halt.
    pub fn drain_and_halt(&self) {
        let sequences = self.worker_sequences();
        while self.ring_buffer.cursor() > minimum_sequence(&sequences, i64::MAX) {
            std::thread::yield_now();
        }
        self.halt();
    }

    /// Halt every member; events not yet claimed are left in the ring.
    pub fn halt(&self) {
        for p in &self.processors {
            p.halt();
        }
    }

    pub fn is_running(&self) -> bool {
        self.processors.iter().any(|p| p.is_running())
    }
}
