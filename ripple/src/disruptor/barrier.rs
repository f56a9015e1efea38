//! Sequence barrier: the consumer-side view of a ring buffer.

use std::sync::Arc;

use crate::disruptor::alert::SequenceBarrierAlert;
use crate::disruptor::sequence::{ DependentSequence, Sequence, SequenceGroup };
use crate::disruptor::wait_strategy::{ WaitResult, WaitStrategy };

/// What a barrier waits on besides the producer cursor.
#[derive(Debug, Clone)]
enum Dependency {
    /// No upstream consumers: the published cursor is the limit
    Cursor(Arc<Sequence>),
    /// Consumers that must finish a slot before this barrier hands it out
    Upstream(SequenceGroup),
}

impl DependentSequence for Dependency {
    #[inline]
    fn value(&self) -> i64 {
        match self {
            Self::Cursor(cursor) => cursor.get(),
            Self::Upstream(group) => group.value(),
        }
    }
}

/// Coordinates one or more consumers with the producer cursor and with the
/// consumers they depend on.
///
/// Shared by every processor built on it (a worker pool shares one barrier
/// between all of its workers), so `alert` wakes all of them.
pub struct SequenceBarrier {
    wait_strategy: Arc<dyn WaitStrategy>,
    cursor: Arc<Sequence>,
    dependency: Dependency,
    alert: SequenceBarrierAlert,
}

impl SequenceBarrier {
    pub(crate) fn new(
        wait_strategy: Arc<dyn WaitStrategy>,
        cursor: Arc<Sequence>,
        dependents: &[Arc<Sequence>]
    ) -> Self {
        let dependency = if dependents.is_empty() {
            Dependency::Cursor(cursor.clone())
        } else {
            Dependency::Upstream(SequenceGroup::new(dependents))
        };

        Self {
            wait_strategy,
            cursor,
            dependency,
            alert: SequenceBarrierAlert::new(),
        }
    }

    /// Wait for `sequence` to become consumable.
    ///
    /// Returns `Cancel` straight away if the alert is already raised, without
    /// consulting the wait strategy.
    #[inline]
    pub fn wait_for(&self, sequence: i64) -> WaitResult {
        if self.alert.is_active() {
            return WaitResult::Cancel;
        }
        self.wait_strategy.wait_for(sequence, &self.cursor, &self.dependency, &self.alert)
    }

    /// Producer cursor this barrier observes
    #[inline]
    pub fn cursor(&self) -> i64 {
        self.cursor.get()
    }

    /// Highest sequence consumable right now, without waiting
    #[inline]
    pub fn available_sequence(&self) -> i64 {
        self.dependency.value()
    }

    pub fn is_alerted(&self) -> bool {
        self.alert.is_active()
    }

    /// Raise the alert and wake every parked waiter.
    pub fn alert(&self) {
        self.alert.activate();
        self.wait_strategy.signal_all_when_blocking();
    }

    pub fn clear_alert(&self) {
        self.alert.deactivate();
    }
}

impl std::fmt::Debug for SequenceBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceBarrier")
            .field("cursor", &self.cursor.get())
            .field("dependency", &self.dependency)
            .field("alerted", &self.alert.is_active())
            .finish()
    }
}
