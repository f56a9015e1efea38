//! Cooperative cancellation flag carried by a sequence barrier.

use std::sync::atomic::{ AtomicBool, Ordering };

/// Alert status of one [`SequenceBarrier`](super::SequenceBarrier).
///
/// Wait strategies poll `is_active` on every spin iteration and after every
/// wake-up; transitions are idempotent.
#[derive(Debug, Default)]
pub struct SequenceBarrierAlert {
    active: AtomicBool,
}

impl SequenceBarrierAlert {
    pub fn new() -> Self {
        Self { active: AtomicBool::new(false) }
    }

    #[inline(always)]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    #[inline]
    pub fn activate(&self) {
        self.active.store(true, Ordering::Release);
    }

    #[inline]
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_are_idempotent() {
        let alert = SequenceBarrierAlert::new();
        assert!(!alert.is_active());
        alert.activate();
        alert.activate();
        assert!(alert.is_active());
        alert.deactivate();
        alert.deactivate();
        assert!(!alert.is_active());
    }
}
