//! Single-producer sequencer.
//!
//! Only one thread may claim. The claim counter and the cached gating minimum
//! are therefore plain producer-local values; they are atomics only so the
//! type stays `Sync` and capacity queries from other threads are not racy.

use std::sync::atomic::{ AtomicI64, Ordering };
use std::sync::Arc;

use crate::constants::INITIAL_CURSOR_VALUE;
use crate::disruptor::barrier::SequenceBarrier;
use crate::disruptor::sequence::Sequence;
use crate::disruptor::sequencer::{ producer_backoff, Sequencer, SequencerState };
use crate::disruptor::wait_strategy::WaitStrategy;
use crate::error::{ Result, RippleError };
use crate::insights;
use crate::metrics::Metrics;

pub struct SingleProducerSequencer {
    state: SequencerState,
    /// Highest claimed sequence
    next_value: AtomicI64,
    /// Gating minimum seen at the last slow-path check
    cached_value: AtomicI64,
}

impl SingleProducerSequencer {
    pub fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Self {
        Self::with_metrics(buffer_size, wait_strategy, Arc::new(Metrics::new()))
    }

    pub(crate) fn with_metrics(
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
        metrics: Arc<Metrics>
    ) -> Self {
        Self {
            state: SequencerState::new(buffer_size, wait_strategy, metrics),
            next_value: AtomicI64::new(INITIAL_CURSOR_VALUE),
            cached_value: AtomicI64::new(INITIAL_CURSOR_VALUE),
        }
    }

    fn has_capacity(&self, required: i64, do_store: bool) -> bool {
        let next_value = self.next_value.load(Ordering::Relaxed);
        let wrap_point = next_value + required - self.state.buffer_size;
        let cached = self.cached_value.load(Ordering::Relaxed);

        if wrap_point > cached || cached > next_value {
            if do_store {
                self.state.cursor.set_volatile(next_value);
            }
            let min_sequence = self.state.gating_minimum(next_value);
            self.cached_value.store(min_sequence, Ordering::Relaxed);
            if wrap_point > min_sequence {
                return false;
            }
        }
        true
    }
}

impl Sequencer for SingleProducerSequencer {
    #[inline(always)]
    fn buffer_size(&self) -> usize {
        self.state.buffer_size as usize
    }

    #[inline(always)]
    fn cursor_sequence(&self) -> &Arc<Sequence> {
        &self.state.cursor
    }

    fn wait_strategy(&self) -> &Arc<dyn WaitStrategy> {
        &self.state.wait_strategy
    }

    fn next(&self, n: i64) -> i64 {
        let next_value = self.next_value.load(Ordering::Relaxed);
        let next_sequence = next_value + n;
        let wrap_point = next_sequence - self.state.buffer_size;
        let cached = self.cached_value.load(Ordering::Relaxed);

        if wrap_point > cached || cached > next_value {
            // Full fence before reading the gating sequences
            self.state.cursor.set_volatile(next_value);

            let mut min_sequence = self.state.gating_minimum(next_value);
            if wrap_point > min_sequence {
                self.state.metrics.record_backpressure();
                insights::record_backpressure(wrap_point, min_sequence);

                let mut spins = 0;
                while wrap_point > min_sequence {
                    producer_backoff(&mut spins);
                    min_sequence = self.state.gating_minimum(next_value);
                }
            }
            self.cached_value.store(min_sequence, Ordering::Relaxed);
        }

        self.next_value.store(next_sequence, Ordering::Relaxed);
        self.state.metrics.record_claim(n as u64);
        next_sequence
    }

    fn try_next(&self, n: i64) -> Result<i64> {
        if !self.has_capacity(n, true) {
            self.state.metrics.record_insufficient_capacity();
            return Err(RippleError::InsufficientCapacity);
        }
        let next_sequence = self.next_value.load(Ordering::Relaxed) + n;
        self.next_value.store(next_sequence, Ordering::Relaxed);
        self.state.metrics.record_claim(n as u64);
        Ok(next_sequence)
    }

    #[inline]
    fn publish(&self, sequence: i64) {
        self.state.cursor.set(sequence);
        self.state.wait_strategy.signal_all_when_blocking();
    }

    #[inline]
    fn publish_range(&self, _low: i64, high: i64) {
        self.publish(high);
    }

    fn is_available(&self, sequence: i64) -> bool {
        let current = self.state.cursor.get();
        sequence <= current && sequence > current - self.state.buffer_size
    }

    #[inline]
    fn highest_published_sequence(&self, _low: i64, available: i64) -> i64 {
        available
    }

    fn has_available_capacity(&self, required: i64) -> bool {
        self.has_capacity(required, false)
    }

    fn remaining_capacity(&self) -> i64 {
        let next_value = self.next_value.load(Ordering::Relaxed);
        let consumed = self.state.gating_minimum(next_value);
        self.state.buffer_size - (next_value - consumed)
    }

    fn add_gating_sequences(&self, sequences: &[Arc<Sequence>]) {
        self.state.add_gating(sequences);
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.state.remove_gating(sequence)
    }

    fn minimum_gating_sequence(&self) -> i64 {
        self.state.gating_minimum(self.state.cursor.get())
    }

    fn new_barrier(&self, sequences_to_track: &[Arc<Sequence>]) -> SequenceBarrier {
        self.state.new_barrier(sequences_to_track)
    }
}
