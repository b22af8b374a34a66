//! Error types for the sync engine.
//!
//! Protocol errors delivered by the server are never surfaced through this
//! type; they are absorbed by the reaction policy and reflected in the
//! engine status. `SyncError` covers session control misuse and the
//! transport collaborator's own failures.

use crate::engine::EngineState;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The transport returned something the engine cannot use.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Invalid state transition.
    #[error("invalid state transition from {from:?} to {to}")]
    InvalidStateTransition {
        /// Current state.
        from: EngineState,
        /// Attempted operation or target state.
        to: String,
    },

    /// The session has been shut down.
    #[error("sync session closed")]
    SessionClosed,

    /// Invalid engine configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Timeout.
    #[error("operation timed out")]
    Timeout,
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates an invalid state transition error.
    pub fn invalid_transition(from: EngineState, to: impl Into<String>) -> Self {
        Self::InvalidStateTransition {
            from,
            to: to.into(),
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Timeout => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection lost").is_retryable());
        assert!(!SyncError::transport_fatal("invalid certificate").is_retryable());
        assert!(SyncError::Timeout.is_retryable());
        assert!(!SyncError::SessionClosed.is_retryable());
        assert!(!SyncError::Protocol("garbled".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::SessionClosed;
        assert_eq!(err.to_string(), "sync session closed");

        let err = SyncError::invalid_transition(EngineState::Running, "reenable");
        assert_eq!(
            err.to_string(),
            "invalid state transition from Running to reenable"
        );
    }
}
