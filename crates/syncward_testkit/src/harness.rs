//! Single-client test harness.
//!
//! Wires a [`SyncEngine`] to a [`FakeServer`] and exposes the handful of
//! client-side actions sync error tests need: set sync up, make a local
//! change that triggers another cycle, and toggle data types.

use crate::checkers::{await_condition, DEFAULT_AWAIT_TIMEOUT, SETUP_COMPLETED};
use crate::fake_server::{ErrorFrequency, FakeServer};
use std::sync::Arc;
use std::time::Duration;
use syncward_engine::{
    Directive, EngineConfig, EngineState, EscalationConfig, RetryConfig, SyncEngine, SyncResult,
};
use syncward_protocol::{DataType, ProtocolError};

/// Engine configuration used by the harness: no backoff sleeps.
pub fn test_config() -> EngineConfig {
    EngineConfig::new()
        .with_retry(
            RetryConfig::new(5)
                .with_initial_delay(Duration::ZERO)
                .with_jitter(false),
        )
        .with_escalation(EscalationConfig::default())
}

/// A sync client talking to a fake server.
#[derive(Debug, Clone)]
pub struct TestClient {
    engine: Arc<SyncEngine>,
    server: Arc<FakeServer>,
}

impl TestClient {
    /// Creates a stopped client with [`test_config`].
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Creates a stopped client with a custom configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            engine: Arc::new(SyncEngine::new(config).expect("Invalid test config")),
            server: Arc::new(FakeServer::new()),
        }
    }

    /// The client's engine.
    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    /// The fake server.
    pub fn server(&self) -> &Arc<FakeServer> {
        &self.server
    }

    /// Starts setup and drives cycles until setup completes.
    ///
    /// Returns true once the engine is running with setup finished.
    pub fn setup_sync(&self) -> bool {
        if self.engine.start_setup().is_err() {
            return false;
        }
        if !matches!(self.sync(), Ok(Directive::Continue)) {
            return false;
        }
        self.engine.state() == EngineState::Running
            && await_condition(&self.engine, SETUP_COMPLETED, DEFAULT_AWAIT_TIMEOUT)
    }

    /// Runs cycles with retry, as a local change would.
    pub fn sync(&self) -> SyncResult<Directive> {
        self.engine.sync_with_retry(self.server.as_ref())
    }

    /// Makes a local change and runs one sync attempt for it.
    pub fn make_change(&self) -> SyncResult<Directive> {
        self.engine.run_cycle(self.server.as_ref())
    }

    /// Injects `error` on the server at the given frequency.
    pub fn trigger_sync_error(&self, error: ProtocolError, frequency: ErrorFrequency) {
        self.server.trigger_sync_error(error, frequency);
    }

    /// Makes the server reject the client's birthday.
    pub fn trigger_birthday_error(&self) {
        self.server.trigger_birthday_error();
    }

    /// Stops syncing `data_type`. Returns true if it was synced before.
    pub fn disable_sync_for_datatype(&self, data_type: DataType) -> bool {
        self.engine.disable_datatype(data_type)
    }

    /// Starts syncing `data_type` and runs cycles until it is configured.
    ///
    /// Returns true once the reconfiguration completed.
    pub fn enable_sync_for_datatype(&self, data_type: DataType) -> bool {
        if !self.engine.enable_datatype(data_type) {
            return false;
        }
        matches!(self.sync(), Ok(Directive::Continue))
            && await_condition(&self.engine, SETUP_COMPLETED, DEFAULT_AWAIT_TIMEOUT)
    }
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncward_protocol::GetUpdatesOrigin;

    #[test]
    fn setup_against_healthy_server() {
        let client = TestClient::new();
        assert!(client.setup_sync());
        assert_eq!(client.server().request_count(), 1);
        assert_eq!(
            client.server().requests()[0].origin,
            Some(GetUpdatesOrigin::NewClient)
        );
    }

    #[test]
    fn setup_twice_fails() {
        let client = TestClient::new();
        assert!(client.setup_sync());
        assert!(!client.setup_sync());
    }

    #[test]
    fn datatype_roundtrip() {
        let client = TestClient::new();
        assert!(client.setup_sync());

        assert!(client.disable_sync_for_datatype(DataType::Autofill));
        assert!(client.enable_sync_for_datatype(DataType::Autofill));
        assert!(!client.enable_sync_for_datatype(DataType::Autofill));

        let last = client.server().requests().pop().unwrap();
        assert_eq!(last.origin, Some(GetUpdatesOrigin::Reconfiguration));
        assert!(last.types.has(DataType::Autofill));
    }
}
