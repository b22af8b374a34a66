//! Server-signaled protocol errors.

use crate::error::{ParseResult, ProtocolParseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error category reported by the server for a request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    /// No error this cycle.
    #[default]
    None,
    /// Client and server disagree on the data epoch ("birthday").
    NotMyBirthday,
    /// The client's local data is too old to be reconciled.
    ClientDataObsolete,
    /// Temporary server-side failure.
    TransientError,
    /// A server-side data migration finished.
    MigrationDone,
    /// The client is sending requests too quickly.
    Throttled,
    /// Unrecognized server error.
    Unknown,
}

impl ErrorType {
    /// All error types, in declaration order.
    pub const ALL: [ErrorType; 7] = [
        ErrorType::None,
        ErrorType::NotMyBirthday,
        ErrorType::ClientDataObsolete,
        ErrorType::TransientError,
        ErrorType::MigrationDone,
        ErrorType::Throttled,
        ErrorType::Unknown,
    ];

    /// Returns the canonical protocol name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::None => "NONE",
            ErrorType::NotMyBirthday => "NOT_MY_BIRTHDAY",
            ErrorType::ClientDataObsolete => "CLIENT_DATA_OBSOLETE",
            ErrorType::TransientError => "TRANSIENT_ERROR",
            ErrorType::MigrationDone => "MIGRATION_DONE",
            ErrorType::Throttled => "THROTTLED",
            ErrorType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorType {
    type Err = ProtocolParseError;

    fn from_str(s: &str) -> ParseResult<Self> {
        ErrorType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ProtocolParseError::UnknownErrorType(s.to_string()))
    }
}

/// Action the server asks the client to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientAction {
    /// No explicit action was sent.
    #[default]
    UnknownAction,
    /// Turn sync off on this client.
    DisableSyncOnClient,
    /// The client binary is outdated and must be upgraded.
    UpgradeClient,
    /// The account has been disabled server-side.
    StopSyncForDisabledAccount,
}

impl ClientAction {
    /// All client actions, in declaration order.
    pub const ALL: [ClientAction; 4] = [
        ClientAction::UnknownAction,
        ClientAction::DisableSyncOnClient,
        ClientAction::UpgradeClient,
        ClientAction::StopSyncForDisabledAccount,
    ];

    /// Returns the canonical protocol name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientAction::UnknownAction => "UNKNOWN_ACTION",
            ClientAction::DisableSyncOnClient => "DISABLE_SYNC_ON_CLIENT",
            ClientAction::UpgradeClient => "UPGRADE_CLIENT",
            ClientAction::StopSyncForDisabledAccount => "STOP_SYNC_FOR_DISABLED_ACCOUNT",
        }
    }

    /// Returns true if the server sent an explicit directive.
    pub fn is_explicit(&self) -> bool {
        !matches!(self, ClientAction::UnknownAction)
    }
}

impl fmt::Display for ClientAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientAction {
    type Err = ProtocolParseError;

    fn from_str(s: &str) -> ParseResult<Self> {
        ClientAction::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ProtocolParseError::UnknownAction(s.to_string()))
    }
}

/// A protocol error as delivered by the server for one cycle.
///
/// A fresh value is produced per server response. The zero value
/// ([`ProtocolError::none`]) means the cycle completed without error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProtocolError {
    /// Error category.
    pub error_type: ErrorType,
    /// Required client action.
    pub action: ClientAction,
    /// Human-readable description supplied by the server.
    pub description: String,
    /// Help URL supplied by the server.
    pub url: String,
}

impl ProtocolError {
    /// Creates the "no error" value.
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates an error of the given type with no action.
    pub fn new(error_type: ErrorType) -> Self {
        Self {
            error_type,
            ..Self::default()
        }
    }

    /// Sets the client action.
    pub fn with_action(mut self, action: ClientAction) -> Self {
        self.action = action;
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the help URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Returns true unless this is the "no error" value.
    pub fn is_error(&self) -> bool {
        self.error_type != ErrorType::None || self.action.is_explicit()
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error_type, self.action)?;
        if !self.description.is_empty() {
            write!(f, ": {}", self.description)?;
        }
        Ok(())
    }
}
