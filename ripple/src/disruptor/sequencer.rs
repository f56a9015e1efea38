//! Producer-side claim protocol shared by the single- and multi-producer sequencers.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::disruptor::barrier::SequenceBarrier;
use crate::disruptor::sequence::{ minimum_sequence, Sequence };
use crate::disruptor::wait_strategy::WaitStrategy;
use crate::error::Result;
use crate::metrics::Metrics;

/// Claims sequences for producers and publishes them to consumers.
///
/// Implementations assume `1 <= n <= buffer_size` for every claim; the ring
/// buffer validates claim counts before delegating.
pub trait Sequencer: Send + Sync {
    fn buffer_size(&self) -> usize;

    /// Published cursor; consumers never see a sequence above it
    fn cursor_sequence(&self) -> &Arc<Sequence>;

    fn wait_strategy(&self) -> &Arc<dyn WaitStrategy>;

    /// Claim the next `n` sequences, waiting for gating consumers if the ring is
    /// full. Returns the highest claimed sequence.
    fn next(&self, n: i64) -> i64;

    /// Claim the next `n` sequences or fail with `InsufficientCapacity`.
    fn try_next(&self, n: i64) -> Result<i64>;

    fn publish(&self, sequence: i64);

    /// Publish `low..=high` in one step
    fn publish_range(&self, low: i64, high: i64);

    /// Whether `sequence` has been published and not yet wrapped over
    fn is_available(&self, sequence: i64) -> bool;

    /// Highest sequence in `low..=available` below which everything is published.
    /// Returns `low - 1` when `low` itself is not.
    fn highest_published_sequence(&self, low: i64, available: i64) -> i64;

    fn has_available_capacity(&self, required: i64) -> bool;

    /// Free slots left before a claim would have to wait
    fn remaining_capacity(&self) -> i64;

    fn add_gating_sequences(&self, sequences: &[Arc<Sequence>]);

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool;

    /// Slowest gating sequence, or the cursor when nothing gates the producer
    fn minimum_gating_sequence(&self) -> i64;

    fn new_barrier(&self, sequences_to_track: &[Arc<Sequence>]) -> SequenceBarrier;

    #[inline(always)]
    fn cursor(&self) -> i64 {
        self.cursor_sequence().get()
    }
}

/// State common to both sequencers.
pub(crate) struct SequencerState {
    pub(crate) buffer_size: i64,
    pub(crate) wait_strategy: Arc<dyn WaitStrategy>,
    pub(crate) cursor: Arc<Sequence>,
    pub(crate) metrics: Arc<Metrics>,
    gating: RwLock<Vec<Arc<Sequence>>>,
}

impl SequencerState {
    pub(crate) fn new(
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
        metrics: Arc<Metrics>
    ) -> Self {
        Self {
            buffer_size: buffer_size as i64,
            wait_strategy,
            cursor: Arc::new(Sequence::default()),
            metrics,
            gating: RwLock::new(Vec::new()),
        }
    }

    /// Minimum of the gating sequences and `default`
    #[inline]
    pub(crate) fn gating_minimum(&self, default: i64) -> i64 {
        minimum_sequence(&self.gating.read(), default)
    }

    /// New gating sequences start at the current cursor so they never
    /// constrain the producer below what has already been published.
    pub(crate) fn add_gating(&self, sequences: &[Arc<Sequence>]) {
        let mut gating = self.gating.write();
        let cursor = self.cursor.get();
        for sequence in sequences {
            sequence.set(cursor);
            gating.push(sequence.clone());
        }
    }

    pub(crate) fn remove_gating(&self, sequence: &Arc<Sequence>) -> bool {
        let mut gating = self.gating.write();
        let before = gating.len();
        gating.retain(|s| !Arc::ptr_eq(s, sequence));
        gating.len() != before
    }

    pub(crate) fn new_barrier(&self, sequences_to_track: &[Arc<Sequence>]) -> SequenceBarrier {
        SequenceBarrier::new(self.wait_strategy.clone(), self.cursor.clone(), sequences_to_track)
    }
}

/// Pause used by producers while the ring is full
#[inline]
pub(crate) fn producer_backoff(spins: &mut u32) {
    if *spins < 32 {
        *spins += 1;
        std::hint::spin_loop();
    } else {
        std::thread::yield_now();
    }
}
