//! Work processor: one member of a pool of competing consumers.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::disruptor::barrier::SequenceBarrier;
use crate::disruptor::exception_handler::{ ExceptionHandler, LoggingExceptionHandler };
use crate::disruptor::handler::{ guard, EventReleaser, WorkHandler };
use crate::disruptor::processor::{ Armed, EventProcessor, RunState };
use crate::disruptor::ring_buffer::RingBuffer;
use crate::disruptor::sequence::Sequence;
use crate::disruptor::wait_strategy::WaitResult;
use crate::error::Result;
use crate::insights;

const NAME: &str = "WorkProcessor";

/// Claims events one at a time from a work sequence shared with the other
/// members of its pool, so each event is handled by exactly one member.
///
/// The processor's own sequence is moved to `claimed - 1` before the claim CAS
/// and only passes `claimed` with the next claim, so the producer can never
/// wrap over an event a member is still handling.
pub struct WorkProcessor<T> {
    ring_buffer: Arc<RingBuffer<T>>,
    barrier: Arc<SequenceBarrier>,
    handler: Mutex<Box<dyn WorkHandler<T>>>,
    exception_handler: Arc<dyn ExceptionHandler<T>>,
    sequence: Arc<Sequence>,
    work_sequence: Arc<Sequence>,
    state: RunState,
}

impl<T: Send + Sync + 'static> WorkProcessor<T> {
    pub fn new(
        ring_buffer: Arc<RingBuffer<T>>,
        barrier: Arc<SequenceBarrier>,
        handler: Box<dyn WorkHandler<T>>,
        work_sequence: Arc<Sequence>
    ) -> Self {
        Self::with_exception_handler(
            ring_buffer,
            barrier,
            handler,
            work_sequence,
            Arc::new(LoggingExceptionHandler)
        )
    }

    pub fn with_exception_handler(
        ring_buffer: Arc<RingBuffer<T>>,
        barrier: Arc<SequenceBarrier>,
        mut handler: Box<dyn WorkHandler<T>>,
        work_sequence: Arc<Sequence>,
        exception_handler: Arc<dyn ExceptionHandler<T>>
    ) -> Self {
        let sequence = Arc::new(Sequence::default());
        handler.set_event_releaser(EventReleaser::new(sequence.clone()));

        Self {
            ring_buffer,
            barrier,
            handler: Mutex::new(handler),
            exception_handler,
            sequence,
            work_sequence,
            state: RunState::new(),
        }
    }

    fn fault(&self, error: &anyhow::Error, sequence: i64, event: Option<&T>) {
        self.ring_buffer.metrics().record_handler_fault();
        self.exception_handler.handle_event_exception(error, sequence, event);
    }

    fn process_events(&self, handler: &mut dyn WorkHandler<T>) {
        let mut processed = true;
        let mut cached_available = i64::MIN;
        let mut next_sequence = self.sequence.get();

        loop {
            if processed {
                if !self.state.is_running() {
                    break;
                }
                processed = false;
                loop {
                    next_sequence = self.work_sequence.get() + 1;
                    self.sequence.set(next_sequence - 1);
                    if self.work_sequence.compare_and_set(next_sequence - 1, next_sequence) {
                        break;
                    }
                }
            }

            if cached_available >= next_sequence {
                // Claimed exclusively and gated by our sequence at next_sequence - 1
                let event = unsafe { self.ring_buffer.get(next_sequence) };
                if let Err(e) = guard(|| handler.on_event(event)) {
                    self.fault(&e, next_sequence, Some(event));
                }
                self.ring_buffer.metrics().record_batch(1);
                processed = true;
                continue;
            }

            match self.barrier.wait_for(next_sequence) {
                WaitResult::Success(available) => {
                    cached_available = available;
                }
                WaitResult::Timeout => {
                    self.ring_buffer.metrics().record_timeout();
                    insights::record_timeout(next_sequence);
                    let current = self.sequence.get();
                    if let Err(e) = guard(|| handler.on_timeout(current)) {
                        self.fault(&e, current, None);
                    }
                }
                WaitResult::Cancel => {
                    if !self.state.is_running() {
                        break;
                    }
                }
            }
        }
    }
}

impl<T: Send + Sync + 'static> EventProcessor for WorkProcessor<T> {
    fn name(&self) -> &'static str {
        NAME
    }

    fn sequence(&self) -> Arc<Sequence> {
        self.sequence.clone()
    }

    fn halt(&self) {
        self.state.halt();
        self.barrier.alert();
    }

    /// Stops after the event in hand. A member blocked waiting for its claimed
    /// event stops once that event is published and handled.
    fn halt_later(&self) {
        self.state.halt();
    }

    fn is_running(&self) -> bool {
        self.state.is_running()
    }

    fn arm(&self) -> Result<Armed> {
        self.state.try_arm(NAME)
    }

    fn run_armed(&self, _armed: Armed) {
        let _span = crate::span_processor!(NAME);
        crate::enter_span!(_span);

        let mut handler = self.handler.lock();
        self.barrier.clear_alert();
        insights::record_processor_started(NAME, self.sequence.get());

        if let Err(e) = guard(|| handler.on_start()) {
            self.exception_handler.handle_on_start_exception(&e);
        }

        if self.state.is_running() {
            self.process_events(&mut **handler);
        }

        if let Err(e) = guard(|| handler.on_shutdown()) {
            self.exception_handler.handle_on_shutdown_exception(&e);
        }

        self.state.halt();
        insights::record_processor_halted(NAME, self.sequence.get());
    }
}
