//! Pre-allocated ring of event slots driven by a sequencer.

use std::cell::UnsafeCell;
use std::fmt;
use std::sync::Arc;

use crate::disruptor::barrier::SequenceBarrier;
use crate::disruptor::multi::MultiProducerSequencer;
use crate::disruptor::sequence::Sequence;
use crate::disruptor::sequencer::Sequencer;
use crate::disruptor::single::SingleProducerSequencer;
use crate::disruptor::wait_strategy::WaitStrategy;
use crate::disruptor::{ ProducerType, RingBufferConfig };
use crate::error::{ Result, RippleError };
use crate::metrics::Metrics;

/// Fixed-size, power-of-two ring of reusable event slots.
///
/// Slots are created once by a factory and overwritten in place. Sequence `s`
/// lives in slot `s & (size - 1)`.
///
/// # Safety
///
/// Slot access is not checked. A producer may only write sequences it has
/// claimed and not yet published; a consumer may only read sequences its
/// barrier returned, and must be registered as a gating sequence (directly or
/// through the consumers after it) so the producer cannot wrap over a slot
/// still being read.
pub struct RingBuffer<T> {
    entries: Box<[UnsafeCell<T>]>,
    mask: usize,
    sequencer: Box<dyn Sequencer>,
    metrics: Arc<Metrics>,
}

unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send + Sync> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Ring for exactly one publishing thread.
    pub fn create_single_producer<F>(
        factory: F,
        size: usize,
        wait_strategy: Arc<dyn WaitStrategy>
    ) -> Result<Self>
        where F: FnMut() -> T
    {
        Self::create(factory, size, ProducerType::Single, wait_strategy)
    }

    /// Ring that any number of threads may publish to concurrently.
    pub fn create_multi_producer<F>(
        factory: F,
        size: usize,
        wait_strategy: Arc<dyn WaitStrategy>
    ) -> Result<Self>
        where F: FnMut() -> T
    {
        Self::create(factory, size, ProducerType::Multi, wait_strategy)
    }

    pub fn from_config<F>(factory: F, config: &RingBufferConfig) -> Result<Self>
        where F: FnMut() -> T
    {
        Self::create(factory, config.size, config.producer_type, config.wait_strategy.build())
    }

    fn create<F>(
        mut factory: F,
        size: usize,
        producer_type: ProducerType,
        wait_strategy: Arc<dyn WaitStrategy>
    ) -> Result<Self>
        where F: FnMut() -> T
    {
        if size == 0 || !size.is_power_of_two() {
            return Err(RippleError::config(format!("Size must be a power of 2, got {}", size)));
        }

        let metrics = Arc::new(Metrics::new());
        let sequencer: Box<dyn Sequencer> = match producer_type {
            ProducerType::Single =>
                Box::new(SingleProducerSequencer::with_metrics(size, wait_strategy, metrics.clone())),
            ProducerType::Multi =>
                Box::new(MultiProducerSequencer::with_metrics(size, wait_strategy, metrics.clone())),
        };

        let entries = (0..size)
            .map(|_| UnsafeCell::new(factory()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            entries,
            mask: size - 1,
            sequencer,
            metrics,
        })
    }

    // ========================================================================
    // Claim & publish
    // ========================================================================

    /// Claim the next sequence, waiting while the ring is full.
    #[inline]
    pub fn next(&self) -> i64 {
        self.sequencer.next(1)
    }

    /// Claim `n` sequences; returns the highest.
    pub fn next_n(&self, n: i64) -> Result<i64> {
        self.check_batch(n)?;
        Ok(self.sequencer.next(n))
    }

    /// Claim the next sequence without waiting.
    #[inline]
    pub fn try_next(&self) -> Result<i64> {
        self.sequencer.try_next(1)
    }

    pub fn try_next_n(&self, n: i64) -> Result<i64> {
        self.check_batch(n)?;
        self.sequencer.try_next(n)
    }

    #[inline]
    pub fn publish(&self, sequence: i64) {
        self.sequencer.publish(sequence);
    }

    #[inline]
    pub fn publish_range(&self, low: i64, high: i64) {
        self.sequencer.publish_range(low, high);
    }

    /// Claim a slot, fill it, publish it. The slot is published even if
    /// `update` panics, so the cursor can never stall behind it.
    pub fn publish_event<F>(&self, update: F) -> i64 where F: FnOnce(&mut T, i64) {
        let sequence = self.next();
        self.fill_one(sequence, update);
        sequence
    }

    pub fn try_publish_event<F>(&self, update: F) -> Result<i64> where F: FnOnce(&mut T, i64) {
        let sequence = self.try_next()?;
        self.fill_one(sequence, update);
        Ok(sequence)
    }

    /// Claim `n` slots as one batch and publish them together.
    pub fn publish_events<F>(&self, n: i64, mut update: F) -> Result<i64>
        where F: FnMut(&mut T, i64)
    {
        let high = self.next_n(n)?;
        self.fill_and_publish(high - n + 1, high, &mut update);
        Ok(high)
    }

    fn fill_one<F>(&self, sequence: i64, update: F) where F: FnOnce(&mut T, i64) {
        let _publish = PublishOnDrop { sequencer: self.sequencer.as_ref(), low: sequence, high: sequence };
        unsafe {
            update(self.get_mut(sequence), sequence);
        }
    }

    fn fill_and_publish<F>(&self, low: i64, high: i64, mut update: F) where F: FnMut(&mut T, i64) {
        let _publish = PublishOnDrop { sequencer: self.sequencer.as_ref(), low, high };
        for sequence in low..=high {
            // Claimed and not yet published: exclusively ours
            unsafe {
                update(self.get_mut(sequence), sequence);
            }
        }
    }

    fn check_batch(&self, n: i64) -> Result<()> {
        if n < 1 || n > (self.buffer_size() as i64) {
            return Err(
                RippleError::config(
                    format!("n must be > 0 and <= {}, got {}", self.buffer_size(), n)
                )
            );
        }
        Ok(())
    }

    // ========================================================================
    // Slot access
    // ========================================================================

    /// Event stored for `sequence`.
    ///
    /// # Safety
    ///
    /// `sequence` must be available to the caller (returned by its barrier) and
    /// not yet released to the producer by the caller's gating sequence.
    #[inline(always)]
    pub unsafe fn get(&self, sequence: i64) -> &T {
        &*self.entries.get_unchecked((sequence as usize) & self.mask).get()
    }

    /// Mutable access to the slot for `sequence`.
    ///
    /// # Safety
    ///
    /// The caller must hold the claim on `sequence` and not have published it.
    #[inline(always)]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self, sequence: i64) -> &mut T {
        &mut *self.entries.get_unchecked((sequence as usize) & self.mask).get()
    }

    // ========================================================================
    // Consumer wiring
    // ========================================================================

    /// Barrier over the cursor and `sequences_to_track` (the consumers that
    /// must process a slot before the barrier's own consumers see it).
    pub fn new_barrier(&self, sequences_to_track: &[Arc<Sequence>]) -> Arc<SequenceBarrier> {
        Arc::new(self.sequencer.new_barrier(sequences_to_track))
    }

    /// Register consumer sequences the producer must not overtake.
    /// Call before the consumers start.
    pub fn add_gating_sequences(&self, sequences: &[Arc<Sequence>]) {
        self.sequencer.add_gating_sequences(sequences);
    }

    pub fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.sequencer.remove_gating_sequence(sequence)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn minimum_gating_sequence(&self) -> i64 {
        self.sequencer.minimum_gating_sequence()
    }

    pub fn remaining_capacity(&self) -> i64 {
        self.sequencer.remaining_capacity()
    }

    pub fn has_available_capacity(&self, required: i64) -> bool {
        self.sequencer.has_available_capacity(required)
    }

    pub fn is_available(&self, sequence: i64) -> bool {
        self.sequencer.is_available(sequence)
    }

    #[inline]
    pub fn cursor(&self) -> i64 {
        self.sequencer.cursor()
    }

    pub fn cursor_sequence(&self) -> &Arc<Sequence> {
        self.sequencer.cursor_sequence()
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.entries.len()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

impl<T> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("buffer_size", &self.buffer_size())
            .field("cursor", &self.cursor())
            .field("minimum_gating_sequence", &self.minimum_gating_sequence())
            .finish()
    }
}

struct PublishOnDrop<'a> {
    sequencer: &'a dyn Sequencer,
    low: i64,
    high: i64,
}

impl Drop for PublishOnDrop<'_> {
    fn drop(&mut self) {
        self.sequencer.publish_range(self.low, self.high);
    }
}
