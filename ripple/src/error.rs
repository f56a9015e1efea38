//! Error types for Ripple.
//!
//! Only misuse and resource failures are errors. Wait outcomes (timeout,
//! cancellation) travel as [`WaitResult`](crate::disruptor::WaitResult) values
//! and never through this type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RippleError>;

#[derive(Error, Debug)]
pub enum RippleError {
    /// Thread spawn and other OS I/O failures
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid construction or claim parameter
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A non-blocking claim could not proceed without overtaking a gating sequence
    #[error("Insufficient capacity in ring buffer")]
    InsufficientCapacity,

    /// `start`/`run` called on a processor that is already running
    #[error("{processor} is already running")]
    AlreadyRunning { processor: &'static str },

    /// `start`/`run` called on a processor that has been halted
    #[error("{processor} is halted and cannot be restarted")]
    Halted { processor: &'static str },

    #[error("System resource error: {message}")]
    SystemResource { message: String },

    #[error("Unexpected error: {message}")]
    Unexpected { message: String },
}

impl RippleError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }

    pub fn system_resource(message: impl Into<String>) -> Self {
        Self::SystemResource { message: message.into() }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected { message: message.into() }
    }

    /// Check if retrying the same operation later may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InsufficientCapacity)
    }

    /// Check if this error reports a processor wiring bug
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(self, Self::AlreadyRunning { .. } | Self::Halted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let full = RippleError::InsufficientCapacity;
        assert!(full.is_recoverable());
        assert!(!full.is_lifecycle_error());

        let halted = RippleError::Halted { processor: "BatchEventProcessor" };
        assert!(!halted.is_recoverable());
        assert!(halted.is_lifecycle_error());
        assert_eq!(halted.to_string(), "BatchEventProcessor is halted and cannot be restarted");

        let cfg = RippleError::config("Size must be power of 2");
        assert!(matches!(cfg, RippleError::InvalidConfig { .. }));
        assert!(!cfg.is_recoverable());
    }
}
