//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for parsing protocol names.
pub type ParseResult<T> = Result<T, ProtocolParseError>;

/// Errors raised when a textual protocol name cannot be recognized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolParseError {
    /// Unknown error type name.
    #[error("unknown error type: {0}")]
    UnknownErrorType(String),

    /// Unknown client action name.
    #[error("unknown client action: {0}")]
    UnknownAction(String),

    /// Unknown data type name.
    #[error("unknown data type: {0}")]
    UnknownDataType(String),

    /// Unknown GetUpdates origin name.
    #[error("unknown request origin: {0}")]
    UnknownOrigin(String),
}
