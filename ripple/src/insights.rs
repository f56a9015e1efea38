//! Insights - Observability for ripple.
//!
//! Unified tracing, profiling, and logging. Zero-cost when disabled.
//!
//! # Usage
//!
//! ## Basic tracing (console output)
//! ```toml
//! ripple = { version = "0.1", features = ["tracing"] }
//! ```
//! ```rust,ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! ## Tracy profiler (real-time visualization)
//! ```toml
//! ripple = { version = "0.1", features = ["tracy"] }
//! ```
//! ```rust,ignore
//! ripple::init_tracy();
//! ```

/// Initialize Tracy profiler (call once at startup)
#[cfg(feature = "tracy")]
pub fn init_tracy() {
    use tracing_subscriber::layer::SubscriberExt;
    if let Err(e) = tracing::subscriber::set_global_default(
        tracing_subscriber::registry().with(tracing_tracy::TracyLayer::default()),
    ) {
        tracing::warn!(error = %e, "tracy layer not installed");
    }
}

#[cfg(not(feature = "tracy"))]
pub fn init_tracy() {}

/// Record a processor entering its run loop
#[cfg(feature = "tracing")]
#[inline]
pub fn record_processor_started(processor: &'static str, sequence: i64) {
    tracing::info!(processor, sequence, "processor started");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_processor_started(_processor: &'static str, _sequence: i64) {}

/// Record a processor leaving its run loop
#[cfg(feature = "tracing")]
#[inline]
pub fn record_processor_halted(processor: &'static str, sequence: i64) {
    tracing::info!(processor, sequence, "processor halted");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_processor_halted(_processor: &'static str, _sequence: i64) {}

/// Record backpressure (producer waiting on gating sequences)
#[cfg(feature = "tracing")]
#[inline]
pub fn record_backpressure(wrap_point: i64, gating: i64) {
    let _span = tracing::trace_span!("backpressure", wrap_point, gating).entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_backpressure(_wrap_point: i64, _gating: i64) {}

/// Record a wait that lapsed without the sequence becoming available
#[cfg(feature = "tracing")]
#[inline]
pub fn record_timeout(sequence: i64) {
    tracing::debug!(sequence, "wait timed out");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_timeout(_sequence: i64) {}

/// Record a fault raised by a user handler while processing an event
#[cfg(feature = "tracing")]
#[inline]
pub fn record_handler_fault(sequence: i64, error: &anyhow::Error) {
    tracing::error!(sequence, error = %error, "event handler fault");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_handler_fault(_sequence: i64, _error: &anyhow::Error) {}

/// Record a fault raised by a lifecycle hook (`on_start`/`on_shutdown`)
#[cfg(feature = "tracing")]
#[inline]
pub fn record_lifecycle_fault(hook: &'static str, error: &anyhow::Error) {
    tracing::warn!(hook, error = %error, "lifecycle hook fault");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_lifecycle_fault(_hook: &'static str, _error: &anyhow::Error) {}

/// Record a processor thread that could not be pinned to its core
#[cfg(feature = "tracing")]
#[inline]
pub fn record_pin_failure(cpu: usize, error: &crate::error::RippleError) {
    tracing::warn!(cpu, error = %error, "failed to pin processor thread");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_pin_failure(_cpu: usize, _error: &crate::error::RippleError) {}

/// Create a span for a processor thread
#[cfg(feature = "tracing")]
#[macro_export]
macro_rules! span_processor {
    ($name:expr) => {
        tracing::info_span!("processor", name = %$name)
    };
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! span_processor {
    ($name:expr) => {
        ()
    };
}

/// Enter a span (no-op when tracing disabled)
#[cfg(feature = "tracing")]
#[macro_export]
macro_rules! enter_span {
    ($span:expr) => {
        let _guard = $span.enter();
    };
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! enter_span {
    ($span:expr) => {};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insights_compile() {
        // No subscriber installed: every hook must be callable and silent
        record_processor_started("test", -1);
        record_backpressure(10, 2);
        record_timeout(5);
        record_handler_fault(5, &anyhow::anyhow!("boom"));
        record_lifecycle_fault("on_start", &anyhow::anyhow!("boom"));
        record_processor_halted("test", 5);
    }
}
