//! # Syncward Testkit
//!
//! Test utilities for Syncward.
//!
//! This crate provides:
//! - An in-process fake server with error injection
//! - Named status conditions and blocking waits over them
//! - A single-client harness wiring an engine to the fake server
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use syncward_testkit::prelude::*;
//!
//! #[test]
//! fn birthday_error_disables_sync() {
//!     let client = TestClient::new();
//!     assert!(client.setup_sync());
//!     client.trigger_birthday_error();
//!     let _ = client.make_change();
//!     assert!(await_sync_disabled(client.engine()));
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod checkers;
pub mod fake_server;
pub mod generators;
pub mod harness;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::checkers::*;
    pub use crate::fake_server::*;
    pub use crate::generators::*;
    pub use crate::harness::*;
}

pub use checkers::*;
pub use fake_server::*;
pub use generators::*;
pub use harness::*;
