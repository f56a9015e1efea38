//! User callbacks driven by the processors.
//!
//! Optional capabilities (lifecycle, timeout, batch start, event release) are
//! default methods, so a handler only overrides what it uses.

use std::panic::{ catch_unwind, AssertUnwindSafe };
use std::sync::Arc;

use crate::constants::RELEASED_SEQUENCE;
use crate::disruptor::sequence::Sequence;

/// Callback for a [`BatchEventProcessor`](super::BatchEventProcessor).
///
/// # Example
///
/// ```rust,ignore
/// struct Sum(i64);
///
/// impl EventHandler<i64> for Sum {
///     fn on_event(&mut self, event: &i64, _sequence: i64, _end_of_batch: bool) -> anyhow::Result<()> {
///         self.0 += *event;
///         Ok(())
///     }
/// }
/// ```
pub trait EventHandler<T>: Send {
    /// Called once per event, in sequence order. `end_of_batch` is true on the
    /// last event of the batch the barrier returned.
    fn on_event(&mut self, event: &T, sequence: i64, end_of_batch: bool) -> anyhow::Result<()>;

    /// Called on the processor thread before the first wait
    fn on_start(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called on the processor thread after the loop exits
    fn on_shutdown(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when a timeout wait strategy lapsed while waiting for `sequence`
    fn on_timeout(&mut self, _sequence: i64) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called before the first event of each batch
    fn on_batch_start(&mut self, _batch_size: i64) {}
}

/// Callback for a [`WorkProcessor`](super::WorkProcessor). Each event goes to
/// exactly one handler of the pool.
pub trait WorkHandler<T>: Send {
    fn on_event(&mut self, event: &T) -> anyhow::Result<()>;

    fn on_start(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_shutdown(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_timeout(&mut self, _sequence: i64) -> anyhow::Result<()> {
        Ok(())
    }

    /// Receives the releaser of the owning processor before it starts
    fn set_event_releaser(&mut self, _releaser: EventReleaser) {}
}

/// Lets a work handler stop gating the producer for the event in hand.
///
/// After `release` the owning processor's sequence no longer holds the producer
/// back until it claims its next event.
#[derive(Debug, Clone)]
pub struct EventReleaser {
    sequence: Arc<Sequence>,
}

impl EventReleaser {
    pub(crate) fn new(sequence: Arc<Sequence>) -> Self {
        Self { sequence }
    }

    pub fn release(&self) {
        self.sequence.set(RELEASED_SEQUENCE);
    }
}

/// Run a handler callback, turning a panic into an error.
pub(crate) fn guard<R>(f: impl FnOnce() -> anyhow::Result<R>) -> anyhow::Result<R> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            Err(anyhow::anyhow!("handler panicked: {}", message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_passes_through() {
        assert_eq!(guard(|| Ok(5)).unwrap(), 5);
        let err = guard::<()>(|| Err(anyhow::anyhow!("bad event"))).unwrap_err();
        assert_eq!(err.to_string(), "bad event");
    }

    #[test]
    fn test_guard_catches_panic() {
        let err = guard::<()>(|| panic!("kaboom")).unwrap_err();
        assert!(err.to_string().contains("kaboom"));

        let code = 7;
        let err = guard::<()>(|| panic!("code {}", code)).unwrap_err();
        assert!(err.to_string().contains("code 7"));
    }

    #[test]
    fn test_releaser_sets_sentinel() {
        let seq = Arc::new(Sequence::new(3));
        EventReleaser::new(seq.clone()).release();
        assert_eq!(seq.get(), RELEASED_SEQUENCE);
    }
}
