//! # Syncward Protocol
//!
//! Protocol types shared by the Syncward client engine and its tooling.
//!
//! This crate provides:
//! - `ProtocolError` with its closed `ErrorType` and `ClientAction` sets
//! - `DataType` and `DataTypeSet` for the categories that participate in sync
//! - `ProtocolEvent` and `EventLog` for recording request/response cycles
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod data_type;
mod error;
mod event;
mod protocol_error;

pub use data_type::{DataType, DataTypeSet};
pub use error::{ParseResult, ProtocolParseError};
pub use event::{EventLog, GetUpdatesOrigin, ProtocolEvent, DEFAULT_EVENT_HISTORY};
pub use protocol_error::{ClientAction, ErrorType, ProtocolError};
