//! Multi-producer sequencer.
//!
//! Producers reserve ranges with `get_and_add` on a claim sequence that is
//! separate from the published cursor. Publication marks each slot in an
//! `available` array with the round number (`sequence >> index_shift`) of the
//! sequence it now holds, then moves the published cursor forward by CAS to the
//! highest contiguously available sequence. Every publisher helps advance the
//! cursor, so a slot finished early becomes visible as soon as the gap before it
//! is filled, and consumers never observe a gap.

use std::sync::atomic::{ AtomicI32, Ordering };
use std::sync::Arc;

use crate::disruptor::barrier::SequenceBarrier;
use crate::disruptor::sequence::Sequence;
use crate::disruptor::sequencer::{ producer_backoff, Sequencer, SequencerState };
use crate::disruptor::wait_strategy::WaitStrategy;
use crate::error::{ Result, RippleError };
use crate::insights;
use crate::metrics::Metrics;

pub struct MultiProducerSequencer {
    state: SequencerState,
    /// Highest claimed sequence across all producers
    claim: Sequence,
    gating_cache: Sequence,
    available: Box<[AtomicI32]>,
    index_mask: usize,
    index_shift: u32,
}

impl MultiProducerSequencer {
    pub fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Self {
        Self::with_metrics(buffer_size, wait_strategy, Arc::new(Metrics::new()))
    }

    pub(crate) fn with_metrics(
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
        metrics: Arc<Metrics>
    ) -> Self {
        let available = (0..buffer_size)
            .map(|_| AtomicI32::new(-1))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            state: SequencerState::new(buffer_size, wait_strategy, metrics),
            claim: Sequence::default(),
            gating_cache: Sequence::default(),
            available,
            index_mask: buffer_size - 1,
            index_shift: buffer_size.trailing_zeros(),
        }
    }

    #[inline(always)]
    fn availability_flag(&self, sequence: i64) -> i32 {
        (sequence >> self.index_shift) as i32
    }

    #[inline(always)]
    fn set_available(&self, sequence: i64) {
        let index = (sequence as usize) & self.index_mask;
        self.available[index].store(self.availability_flag(sequence), Ordering::SeqCst);
    }

    /// Move the published cursor to the end of the contiguous published run.
    fn advance_cursor(&self) {
        let cursor = &self.state.cursor;
        loop {
            let current = cursor.get();
            let claimed = self.claim.get();
            let highest = self.highest_published_sequence(current + 1, claimed);
            if highest <= current {
                return;
            }
            // Losing the race means another publisher moved it; re-read and help
            cursor.compare_and_set(current, highest);
        }
    }

    fn has_capacity(&self, required: i64, claimed: i64) -> bool {
        let wrap_point = claimed + required - self.state.buffer_size;
        let cached = self.gating_cache.get();

        if wrap_point > cached || cached > claimed {
            let min_sequence = self.state.gating_minimum(claimed);
            self.gating_cache.set(min_sequence);
            if wrap_point > min_sequence {
                return false;
            }
        }
        true
    }
}

impl Sequencer for MultiProducerSequencer {
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
        let current = self.claim.get_and_add(n);
        let next_sequence = current + n;
        let wrap_point = next_sequence - self.state.buffer_size;
        let cached = self.gating_cache.get();

        if wrap_point > cached || cached > current {
            let mut gating = self.state.gating_minimum(current);
            if wrap_point > gating {
                self.state.metrics.record_backpressure();
                insights::record_backpressure(wrap_point, gating);

                let mut spins = 0;
                while wrap_point > gating {
                    producer_backoff(&mut spins);
                    gating = self.state.gating_minimum(current);
                }
            }
            self.gating_cache.set(gating);
        }

        self.state.metrics.record_claim(n as u64);
        next_sequence
    }

    fn try_next(&self, n: i64) -> Result<i64> {
        loop {
            let current = self.claim.get();
            let next_sequence = current + n;

            if !self.has_capacity(n, current) {
                self.state.metrics.record_insufficient_capacity();
                return Err(RippleError::InsufficientCapacity);
            }

            if self.claim.compare_and_set(current, next_sequence) {
                self.state.metrics.record_claim(n as u64);
                return Ok(next_sequence);
            }
        }
    }

    fn publish(&self, sequence: i64) {
        self.set_available(sequence);
        self.advance_cursor();
        self.state.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, low: i64, high: i64) {
        for sequence in low..=high {
            self.set_available(sequence);
        }
        self.advance_cursor();
        self.state.wait_strategy.signal_all_when_blocking();
    }

    fn is_available(&self, sequence: i64) -> bool {
        let index = (sequence as usize) & self.index_mask;
        self.available[index].load(Ordering::SeqCst) == self.availability_flag(sequence)
    }

    fn highest_published_sequence(&self, low: i64, available: i64) -> i64 {
        for sequence in low..=available {
            if !self.is_available(sequence) {
                return sequence - 1;
            }
        }
        available
    }

    fn has_available_capacity(&self, required: i64) -> bool {
        self.has_capacity(required, self.claim.get())
    }

    fn remaining_capacity(&self) -> i64 {
        let claimed = self.claim.get();
        let consumed = self.state.gating_minimum(claimed);
        self.state.buffer_size - (claimed - consumed)
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
