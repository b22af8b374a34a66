//! Protocol event log.
//!
//! Each request sent to the server and each response received back is
//! recorded as a [`ProtocolEvent`]. Events are kept in a bounded
//! [`EventLog`] so that diagnostics tooling can show the most recent
//! traffic without unbounded memory growth.

use crate::data_type::DataTypeSet;
use crate::error::{ParseResult, ProtocolParseError};
use crate::protocol_error::ProtocolError;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default number of events retained by an [`EventLog`].
pub const DEFAULT_EVENT_HISTORY: usize = 256;

/// Why a configuration request was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetUpdatesOrigin {
    /// First download for a freshly set up client.
    NewClient,
    /// The set of enabled data types changed.
    Reconfiguration,
    /// Retry after a failed cycle.
    Retry,
}

impl GetUpdatesOrigin {
    /// Returns the canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            GetUpdatesOrigin::NewClient => "NEW_CLIENT",
            GetUpdatesOrigin::Reconfiguration => "RECONFIGURATION",
            GetUpdatesOrigin::Retry => "RETRY",
        }
    }
}

impl fmt::Display for GetUpdatesOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GetUpdatesOrigin {
    type Err = ProtocolParseError;

    fn from_str(s: &str) -> ParseResult<Self> {
        [
            GetUpdatesOrigin::NewClient,
            GetUpdatesOrigin::Reconfiguration,
            GetUpdatesOrigin::Retry,
        ]
        .into_iter()
        .find(|o| o.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| ProtocolParseError::UnknownOrigin(s.to_string()))
    }
}

/// A single request or response observed on the sync protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEvent {
    /// A configuration request (setup or data type change).
    ConfigureRequest {
        /// When the request was issued.
        timestamp: SystemTime,
        /// Why it was issued.
        origin: GetUpdatesOrigin,
        /// Data types being configured.
        types: DataTypeSet,
    },
    /// A steady-state request.
    NormalRequest {
        /// When the request was issued.
        timestamp: SystemTime,
        /// Data types included in the request.
        types: DataTypeSet,
    },
    /// The outcome of a completed cycle.
    ServerResponse {
        /// Timestamp reported by the transport.
        timestamp: SystemTime,
        /// Protocol error carried by the response.
        error: ProtocolError,
    },
}

impl ProtocolEvent {
    /// Returns when the event happened.
    pub fn timestamp(&self) -> SystemTime {
        match self {
            ProtocolEvent::ConfigureRequest { timestamp, .. }
            | ProtocolEvent::NormalRequest { timestamp, .. }
            | ProtocolEvent::ServerResponse { timestamp, .. } => *timestamp,
        }
    }

    /// Returns a short label for the event.
    pub fn event_type(&self) -> &'static str {
        match self {
            ProtocolEvent::ConfigureRequest {
                origin: GetUpdatesOrigin::NewClient,
                ..
            } => "Initial GetUpdates request",
            ProtocolEvent::ConfigureRequest { .. } => "Configure GetUpdates request",
            ProtocolEvent::NormalRequest { .. } => "Normal GetUpdates request",
            ProtocolEvent::ServerResponse { .. } => "Server response",
        }
    }

    /// Returns a one-line description of the event.
    pub fn details(&self) -> String {
        match self {
            ProtocolEvent::ConfigureRequest { origin, types, .. } => {
                format!("Origin: {origin}, types: {types}")
            }
            ProtocolEvent::NormalRequest { types, .. } => format!("Types: {types}"),
            ProtocolEvent::ServerResponse { error, .. } if error.is_error() => {
                format!("Error: {error}")
            }
            ProtocolEvent::ServerResponse { .. } => "Success".to_string(),
        }
    }

    /// Returns the event as a structured JSON value.
    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "type": self.event_type(),
            "timestamp_ms": millis_since_epoch(self.timestamp()),
            "details": self.details(),
        });

        match self {
            ProtocolEvent::ConfigureRequest { origin, types, .. } => {
                value["origin"] = json!(origin.as_str());
                value["types"] = json!(types);
            }
            ProtocolEvent::NormalRequest { types, .. } => {
                value["types"] = json!(types);
            }
            ProtocolEvent::ServerResponse { error, .. } => {
                value["error"] = json!(error);
            }
        }

        value
    }
}

fn millis_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A bounded history of protocol events, oldest first.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<ProtocolEvent>,
    capacity: usize,
}

impl EventLog {
    /// Creates a log with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_HISTORY)
    }

    /// Creates a log that keeps at most `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(DEFAULT_EVENT_HISTORY)),
            capacity,
        }
    }

    /// Records an event, dropping the oldest one if the log is full.
    pub fn record(&mut self, event: ProtocolEvent) {
        if self.capacity == 0 {
            return;
        }
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Returns up to `limit` of the most recent events, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<ProtocolEvent> {
        let skip = self.events.len().saturating_sub(limit);
        self.events.iter().skip(skip).cloned().collect()
    }

    /// Number of events currently retained.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no events are retained.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Maximum number of retained events.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops all retained events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
