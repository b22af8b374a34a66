//! # Syncward Engine
//!
//! Reaction engine for server-signaled sync protocol errors.
//!
//! This crate provides:
//! - Classification of protocol errors into a closed set of outcomes
//! - A reaction policy with exponential backoff and escalation of retry storms
//! - The observable engine status with observers and blocking/async waits
//! - The session engine driving request/response cycles through a transport
//!
//! ## Architecture
//!
//! Every server response flows through the same pipeline:
//! 1. [`classify`] maps the raw [`ProtocolError`](syncward_protocol::ProtocolError)
//!    to a [`ClassifiedOutcome`]
//! 2. [`ReactionPolicy`] turns the outcome into a new [`EngineStatus`] and a
//!    [`Directive`] for the engine loop
//! 3. The [`StatusSurface`] publishes the new status atomically and wakes
//!    observers and waiters
//!
//! ## Key Invariants
//!
//! - An explicit server action always wins over the error type
//! - A status update is never observed half-applied
//! - Once disabled, only an explicit re-enable resumes sync
//! - Transport failures never change the engine status

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod classify;
mod config;
mod engine;
mod error;
mod policy;
mod status;
mod transport;

pub use classify::{classify, ClassifiedOutcome, RequiredAction};
pub use config::{EngineConfig, EscalationConfig, RetryConfig};
pub use engine::{EngineState, EngineStats, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use policy::{Directive, EngineMode, Reaction, ReactionPolicy};
pub use status::{EngineStatus, StatusSurface, WaitOutcome};
pub use transport::{CycleRequest, MockTransport, ServerResponse, SyncTransport};
