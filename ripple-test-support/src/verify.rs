//! Delivery verification: ordering for batch consumers, exactly-once for pools.

use std::sync::atomic::{ AtomicI64, AtomicU64, AtomicU8, Ordering };
use std::sync::{ Mutex, MutexGuard, PoisonError };

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Checks that one consumer sees every sequence once and in order, and that
/// the last event it saw closed its batch (`end_of_batch`).
///
/// Fed through [`SequenceChecker::check_batched`], it also checks that
/// `end_of_batch` is raised on the last event of each announced batch and on
/// no other.
pub struct SequenceChecker {
    /// Expected next sequence
    next_expected: AtomicI64,
    /// Gaps detected: (start, end)
    gaps: Mutex<Vec<(i64, i64)>>,
    total_seen: AtomicU64,
    /// Duplicates and late arrivals
    out_of_order: AtomicU64,
    batches: AtomicU64,
    /// Sequence that raised the most recent `end_of_batch`
    last_batch_end: AtomicI64,
    /// Events left in the announced batch (0 = between batches)
    batch_remaining: AtomicI64,
    batch_mismatches: AtomicU64,
}

impl Default for SequenceChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceChecker {
    pub fn new() -> Self {
        Self::with_start(0)
    }

    pub fn with_start(start: i64) -> Self {
        Self {
            next_expected: AtomicI64::new(start),
            gaps: Mutex::new(Vec::new()),
            total_seen: AtomicU64::new(0),
            out_of_order: AtomicU64::new(0),
            batches: AtomicU64::new(0),
            last_batch_end: AtomicI64::new(start - 1),
            batch_remaining: AtomicI64::new(0),
            batch_mismatches: AtomicU64::new(0),
        }
    }

    /// Check one delivered sequence
    pub fn check(&self, seq: i64, end_of_batch: bool) -> SequenceStatus {
        self.total_seen.fetch_add(1, Ordering::Relaxed);
        if end_of_batch {
            self.batches.fetch_add(1, Ordering::Relaxed);
            self.last_batch_end.store(seq, Ordering::Relaxed);
        }

        let expected = self.next_expected.load(Ordering::Relaxed);
        if seq == expected {
            self.next_expected.store(seq + 1, Ordering::Relaxed);
            SequenceStatus::InOrder
        } else if seq < expected {
            self.out_of_order.fetch_add(1, Ordering::Relaxed);
            SequenceStatus::OutOfOrder
        } else {
            let (start, end) = (expected, seq - 1);
            lock(&self.gaps).push((start, end));
            self.next_expected.store(seq + 1, Ordering::Relaxed);
            SequenceStatus::Gap { start, end }
        }
    }

    /// Check one delivered sequence that belongs to a batch of `batch_size`
    /// events, as announced by the processor's batch-start hook.
    pub fn check_batched(&self, seq: i64, end_of_batch: bool, batch_size: i64) -> SequenceStatus {
        let mut remaining = self.batch_remaining.load(Ordering::Relaxed);
        if remaining <= 0 {
            remaining = batch_size;
        }
        remaining -= 1;
        self.batch_remaining.store(remaining, Ordering::Relaxed);
        if end_of_batch != (remaining == 0) {
            self.batch_mismatches.fetch_add(1, Ordering::Relaxed);
        }
        self.check(seq, end_of_batch)
    }

    pub fn gaps(&self) -> Vec<(i64, i64)> {
        lock(&self.gaps).clone()
    }

    pub fn stats(&self) -> SequenceStats {
        let gaps = lock(&self.gaps);
        let next_expected = self.next_expected.load(Ordering::Relaxed);
        SequenceStats {
            total_seen: self.total_seen.load(Ordering::Relaxed),
            next_expected,
            gap_count: gaps.len() as u64,
            total_missing: gaps
                .iter()
                .map(|(s, e)| (e - s + 1) as u64)
                .sum(),
            out_of_order: self.out_of_order.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            batch_mismatches: self.batch_mismatches.load(Ordering::Relaxed),
            open_batch: self.last_batch_end.load(Ordering::Relaxed) != next_expected - 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceStatus {
    InOrder,
    OutOfOrder,
    Gap {
        start: i64,
        end: i64,
    },
}

#[derive(Debug, Clone)]
pub struct SequenceStats {
    pub total_seen: u64,
    pub next_expected: i64,
    pub gap_count: u64,
    pub total_missing: u64,
    pub out_of_order: u64,
    pub batches: u64,
    /// `end_of_batch` raised inside a batch, or missing at its end
    pub batch_mismatches: u64,
    /// Last delivered event did not close its batch
    pub open_batch: bool,
}

impl SequenceStats {
    pub fn is_perfect(&self) -> bool {
        self.gap_count == 0 && self.out_of_order == 0 && self.batch_mismatches == 0 && !self.open_batch
    }
}

/// Records which pool member handled each sequence of `0..total`.
pub struct DeliveryLedger {
    deliveries: Box<[AtomicU8]>,
    per_worker: Box<[AtomicU64]>,
    duplicates: AtomicU64,
    out_of_range: AtomicU64,
}

impl DeliveryLedger {
    pub fn new(total: usize, workers: usize) -> Self {
        Self {
            deliveries: (0..total).map(|_| AtomicU8::new(0)).collect(),
            per_worker: (0..workers).map(|_| AtomicU64::new(0)).collect(),
            duplicates: AtomicU64::new(0),
            out_of_range: AtomicU64::new(0),
        }
    }

    /// Returns false if `seq` had already been delivered
    pub fn record(&self, worker: usize, seq: i64) -> bool {
        if let Some(counter) = self.per_worker.get(worker) {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        let Some(slot) = usize::try_from(seq)
            .ok()
            .and_then(|i| self.deliveries.get(i)) else {
            self.out_of_range.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        if slot.fetch_add(1, Ordering::AcqRel) > 0 {
            self.duplicates.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    pub fn delivered(&self) -> usize {
        self.deliveries
            .iter()
            .filter(|d| d.load(Ordering::Acquire) > 0)
            .count()
    }

    pub fn missing(&self) -> Vec<i64> {
        self.deliveries
            .iter()
            .enumerate()
            .filter(|(_, d)| d.load(Ordering::Acquire) == 0)
            .map(|(i, _)| i as i64)
            .collect()
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }

    pub fn per_worker(&self) -> Vec<u64> {
        self.per_worker
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect()
    }

    pub fn is_exactly_once(&self) -> bool {
        self.duplicates() == 0 &&
            self.out_of_range.load(Ordering::Relaxed) == 0 &&
            self.delivered() == self.deliveries.len()
    }
}
