//! Batch event processor: one handler sees every event, in order.

use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;

use parking_lot::Mutex;

use crate::disruptor::barrier::SequenceBarrier;
use crate::disruptor::exception_handler::{ ExceptionHandler, LoggingExceptionHandler };
use crate::disruptor::handler::{ guard, EventHandler };
use crate::disruptor::processor::{ Armed, EventProcessor, RunState };
use crate::disruptor::ring_buffer::RingBuffer;
use crate::disruptor::sequence::Sequence;
use crate::disruptor::wait_strategy::WaitResult;
use crate::error::Result;
use crate::insights;

const NAME: &str = "BatchEventProcessor";

/// Waits on a barrier and hands each available batch to an [`EventHandler`].
///
/// Its sequence advances to the end of a batch only after every event in the
/// batch was handed to the handler. Handler faults (errors and panics) go to
/// the exception handler and the loop moves on to the next event.
///
/// # Example
///
/// ```rust,ignore
/// let barrier = ring.new_barrier(&[]);
/// let processor = Arc::new(BatchEventProcessor::new(ring.clone(), barrier, MyHandler));
/// ring.add_gating_sequences(&[processor.sequence()]);
/// let handle = processor::start(&processor)?;
/// ```
pub struct BatchEventProcessor<T> {
    ring_buffer: Arc<RingBuffer<T>>,
    barrier: Arc<SequenceBarrier>,
    handler: Mutex<Box<dyn EventHandler<T>>>,
    exception_handler: Arc<dyn ExceptionHandler<T>>,
    sequence: Arc<Sequence>,
    state: RunState,
    drain_on_halt: AtomicBool,
}

impl<T: Send + Sync + 'static> BatchEventProcessor<T> {
    pub fn new<H>(ring_buffer: Arc<RingBuffer<T>>, barrier: Arc<SequenceBarrier>, handler: H) -> Self
        where H: EventHandler<T> + 'static
    {
        Self {
            ring_buffer,
            barrier,
            handler: Mutex::new(Box::new(handler)),
            exception_handler: Arc::new(LoggingExceptionHandler),
            sequence: Arc::new(Sequence::default()),
            state: RunState::new(),
            drain_on_halt: AtomicBool::new(false),
        }
    }

    pub fn with_exception_handler<E>(mut self, exception_handler: E) -> Self
        where E: ExceptionHandler<T> + 'static
    {
        self.exception_handler = Arc::new(exception_handler);
        self
    }

    pub fn barrier(&self) -> &Arc<SequenceBarrier> {
        &self.barrier
    }

    /// Hand `low..=high` to the handler and advance the sequence to `high`.
    fn process_batch(&self, handler: &mut dyn EventHandler<T>, low: i64, high: i64) {
        if let Err(e) = guard(|| {
            handler.on_batch_start(high - low + 1);
            Ok(())
        }) {
            self.fault(&e, low, None);
        }

        for sequence in low..=high {
            // Published and gated by our own sequence until the batch ends
            let event = unsafe { self.ring_buffer.get(sequence) };
            if let Err(e) = guard(|| handler.on_event(event, sequence, sequence == high)) {
                self.fault(&e, sequence, Some(event));
            }
        }

        self.sequence.set(high);
        self.ring_buffer.metrics().record_batch((high - low + 1) as u64);
    }

    fn fault(&self, error: &anyhow::Error, sequence: i64, event: Option<&T>) {
        self.ring_buffer.metrics().record_handler_fault();
        self.exception_handler.handle_event_exception(error, sequence, event);
    }

    /// Process whatever is available right now without waiting
    fn drain(&self, handler: &mut dyn EventHandler<T>) {
        let next_sequence = self.sequence.get() + 1;
        let available = self.barrier.available_sequence();
        if available >= next_sequence {
            self.process_batch(handler, next_sequence, available);
        }
    }

    fn process_events(&self, handler: &mut dyn EventHandler<T>) {
        let mut next_sequence = self.sequence.get() + 1;

        loop {
            match self.barrier.wait_for(next_sequence) {
                WaitResult::Success(available) => {
                    self.process_batch(handler, next_sequence, available);
                    next_sequence = available + 1;
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
                    if self.drain_on_halt.load(Ordering::Acquire) {
                        self.drain(handler);
                        break;
                    }
                    if !self.state.is_running() {
                        break;
                    }
                }
            }
        }
    }
}

impl<T: Send + Sync + 'static> EventProcessor for BatchEventProcessor<T> {
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

    fn halt_later(&self) {
        self.drain_on_halt.store(true, Ordering::Release);
        self.halt();
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

        // A halt racing with start may have had its alert cleared above
        if self.state.is_running() {
            self.process_events(&mut **handler);
        } else if self.drain_on_halt.load(Ordering::Acquire) {
            self.drain(&mut **handler);
        }

        if let Err(e) = guard(|| handler.on_shutdown()) {
            self.exception_handler.handle_on_shutdown_exception(&e);
        }

        self.state.halt();
        insights::record_processor_halted(NAME, self.sequence.get());
    }
}
