//! Where processors send handler faults.

use crate::insights;

/// Receives faults raised by event, work and lifecycle callbacks.
///
/// Implementations must not panic; the processor keeps running after every call.
pub trait ExceptionHandler<T>: Send + Sync {
    /// `event` is `None` for faults raised outside an event, such as the
    /// timeout and batch-start hooks.
    fn handle_event_exception(&self, error: &anyhow::Error, sequence: i64, event: Option<&T>);

    fn handle_on_start_exception(&self, error: &anyhow::Error);

    fn handle_on_shutdown_exception(&self, error: &anyhow::Error);
}

/// Default handler: logs every fault through `insights` and keeps going.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingExceptionHandler;

impl<T> ExceptionHandler<T> for LoggingExceptionHandler {
    fn handle_event_exception(&self, error: &anyhow::Error, sequence: i64, _event: Option<&T>) {
        insights::record_handler_fault(sequence, error);
    }

    fn handle_on_start_exception(&self, error: &anyhow::Error) {
        insights::record_lifecycle_fault("on_start", error);
    }

    fn handle_on_shutdown_exception(&self, error: &anyhow::Error) {
        insights::record_lifecycle_fault("on_shutdown", error);
    }
}

/// Drops every fault silently.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreExceptionHandler;

impl<T> ExceptionHandler<T> for IgnoreExceptionHandler {
    fn handle_event_exception(&self, _error: &anyhow::Error, _sequence: i64, _event: Option<&T>) {}

    fn handle_on_start_exception(&self, _error: &anyhow::Error) {}

    fn handle_on_shutdown_exception(&self, _error: &anyhow::Error) {}
}
