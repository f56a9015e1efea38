//! Metrics for ripple ring buffers.
//!
//! Lightweight counters for observability. Each ring buffer owns one
//! `Metrics` instance and hands it to every processor built over it.

use std::sync::atomic::{ AtomicU64, Ordering };

pub struct Metrics {
    pub claims: AtomicU64,
    pub backpressure_events: AtomicU64,
    pub insufficient_capacity: AtomicU64,
    pub batches: AtomicU64,
    pub events_processed: AtomicU64,
    pub timeouts: AtomicU64,
    pub handler_faults: AtomicU64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            claims: AtomicU64::new(0),
            backpressure_events: AtomicU64::new(0),
            insufficient_capacity: AtomicU64::new(0),
            batches: AtomicU64::new(0),
            events_processed: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            handler_faults: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_claim(&self, count: u64) {
        self.claims.fetch_add(count, Ordering::Relaxed);
    }

    /// A claim had to wait for the slowest gating sequence
    #[inline]
    pub fn record_backpressure(&self) {
        self.backpressure_events.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_insufficient_capacity(&self) {
        self.insufficient_capacity.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_batch(&self, events: u64) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.events_processed.fetch_add(events, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_handler_fault(&self) {
        self.handler_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            claims: self.claims.load(Ordering::Relaxed),
            backpressure_events: self.backpressure_events.load(Ordering::Relaxed),
            insufficient_capacity: self.insufficient_capacity.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            events_processed: self.events_processed.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            handler_faults: self.handler_faults.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.claims.store(0, Ordering::Relaxed);
        self.backpressure_events.store(0, Ordering::Relaxed);
        self.insufficient_capacity.store(0, Ordering::Relaxed);
        self.batches.store(0, Ordering::Relaxed);
        self.events_processed.store(0, Ordering::Relaxed);
        self.timeouts.store(0, Ordering::Relaxed);
        self.handler_faults.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub claims: u64,
    pub backpressure_events: u64,
    pub insufficient_capacity: u64,
    pub batches: u64,
    pub events_processed: u64,
    pub timeouts: u64,
    pub handler_faults: u64,
}

impl MetricsSnapshot {
    /// Mean events per delivered batch (0 when nothing was processed)
    pub fn mean_batch_size(&self) -> f64 {
        if self.batches == 0 {
            0.0
        } else {
            self.events_processed as f64 / self.batches as f64
        }
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "claims={} backpressure={} full={} batches={} events={} timeouts={} faults={}",
            self.claims,
            self.backpressure_events,
            self.insufficient_capacity,
            self.batches,
            self.events_processed,
            self.timeouts,
            self.handler_faults
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let m = Metrics::new();
        m.record_claim(3);
        m.record_backpressure();
        m.record_batch(4);
        m.record_batch(2);

        let s = m.snapshot();
        assert_eq!(s.claims, 3);
        assert_eq!(s.backpressure_events, 1);
        assert_eq!(s.batches, 2);
        assert_eq!(s.events_processed, 6);
        assert_eq!(s.mean_batch_size(), 3.0);

        m.reset();
        assert_eq!(m.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_snapshot_display() {
        let m = Metrics::new();
        m.record_timeout();
        let text = m.snapshot().to_string();
        assert!(text.contains("timeouts=1"));
    }
}
