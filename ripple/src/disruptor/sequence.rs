//! Padded sequence counters.
//!
//! A `Sequence` is the single coordination primitive of the ring: the producer
//! cursor, the multi-producer claim counter, every consumer's progress marker
//! and the shared work sequence of a worker pool are all `Sequence`s.

use std::fmt;
use std::sync::atomic::{ AtomicI64, Ordering };
use std::sync::Arc;

use crate::constants::INITIAL_CURSOR_VALUE;

/// Cache-line padded 64-bit counter.
///
/// Aligning to 128 bytes keeps each sequence on its own pair of cache lines,
/// so a producer cursor and the consumer sequences it is compared against never
/// invalidate each other's lines (false sharing), including through adjacent-line
/// prefetch.
#[repr(align(128))]
pub struct Sequence {
    value: AtomicI64,
    _padding: [u8; 120], // 128 - 8 bytes for AtomicI64
}

impl Sequence {
    pub fn new(initial: i64) -> Self {
        Self {
            value: AtomicI64::new(initial),
            _padding: [0; 120],
        }
    }

    /// Current value (Acquire)
    #[inline(always)]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Store a new value (Release)
    #[inline(always)]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Store with a full fence, so later loads cannot be reordered before it
    #[inline(always)]
    pub fn set_volatile(&self, value: i64) {
        self.value.store(value, Ordering::SeqCst);
    }

    #[inline(always)]
    pub fn compare_and_set(&self, expected: i64, new_value: i64) -> bool {
        self.value
            .compare_exchange(expected, new_value, Ordering::SeqCst, Ordering::Acquire)
            .is_ok()
    }

    #[inline(always)]
    pub fn increment_and_get(&self) -> i64 {
        self.add_and_get(1)
    }

    #[inline(always)]
    pub fn add_and_get(&self, increment: i64) -> i64 {
        self.value.fetch_add(increment, Ordering::SeqCst) + increment
    }

    #[inline(always)]
    pub fn get_and_add(&self, increment: i64) -> i64 {
        self.value.fetch_add(increment, Ordering::SeqCst)
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(INITIAL_CURSOR_VALUE)
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sequence").field(&self.get()).finish()
    }
}

/// Anything a wait strategy can poll for progress.
pub trait DependentSequence: Send + Sync {
    fn value(&self) -> i64;
}

impl DependentSequence for Sequence {
    #[inline(always)]
    fn value(&self) -> i64 {
        self.get()
    }
}

/// Fixed set of upstream sequences, read as their minimum.
#[derive(Debug, Clone)]
pub struct SequenceGroup {
    sequences: Vec<Arc<Sequence>>,
}

impl SequenceGroup {
    pub fn new(sequences: &[Arc<Sequence>]) -> Self {
        Self { sequences: sequences.to_vec() }
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

impl DependentSequence for SequenceGroup {
    #[inline]
    fn value(&self) -> i64 {
        minimum_sequence(&self.sequences, i64::MAX)
    }
}

/// Smallest value among `sequences`, or `minimum` if that is smaller (or the slice is empty).
#[inline]
pub fn minimum_sequence(sequences: &[Arc<Sequence>], minimum: i64) -> i64 {
    sequences.iter().fold(minimum, |min, s| min.min(s.get()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_layout() {
        use crate::constants::CACHE_LINE_SIZE;
        assert_eq!(std::mem::size_of::<Sequence>(), CACHE_LINE_SIZE);
        assert_eq!(std::mem::align_of::<Sequence>(), CACHE_LINE_SIZE);
    }

    #[test]
    fn test_default_is_initial_cursor() {
        assert_eq!(Sequence::default().get(), INITIAL_CURSOR_VALUE);
    }

    #[test]
    fn test_atomic_operations() {
        let seq = Sequence::new(5);
        assert!(seq.compare_and_set(5, 7));
        assert!(!seq.compare_and_set(5, 9));
        assert_eq!(seq.get(), 7);
        assert_eq!(seq.increment_and_get(), 8);
        assert_eq!(seq.add_and_get(4), 12);
        assert_eq!(seq.get_and_add(3), 12);
        assert_eq!(seq.get(), 15);
        seq.set_volatile(20);
        assert_eq!(seq.get(), 20);
    }

    #[test]
    fn test_minimum_sequence() {
        let seqs = vec![Arc::new(Sequence::new(7)), Arc::new(Sequence::new(3)), Arc::new(Sequence::new(9))];
        assert_eq!(minimum_sequence(&seqs, i64::MAX), 3);
        assert_eq!(minimum_sequence(&seqs, 1), 1);
        assert_eq!(minimum_sequence(&[], 42), 42);
    }

    #[test]
    fn test_group_tracks_slowest() {
        let a = Arc::new(Sequence::new(10));
        let b = Arc::new(Sequence::new(4));
        let group = SequenceGroup::new(&[a.clone(), b.clone()]);
        assert_eq!(group.value(), 4);
        b.set(12);
        assert_eq!(group.value(), 10);
    }

    #[test]
    fn test_concurrent_increments() {
        let seq = Arc::new(Sequence::new(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let s = seq.clone();
                std::thread::spawn(move || {
                    for _ in 0..10_000 {
                        s.increment_and_get();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(seq.get(), 40_000);
    }
}
