//! Transport boundary.
//!
//! The engine performs no I/O itself. A [`SyncTransport`] carries one
//! request/response cycle to the server and hands back the protocol error
//! the server attached to the response, if any.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;
use syncward_protocol::{DataTypeSet, GetUpdatesOrigin, ProtocolError};
use uuid::Uuid;

/// A request for one sync cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleRequest {
    /// Session issuing the request.
    pub session_id: Uuid,
    /// Data types participating in this cycle.
    pub types: DataTypeSet,
    /// Set for configuration cycles (setup, data type changes, retries of those).
    pub origin: Option<GetUpdatesOrigin>,
}

impl CycleRequest {
    /// Returns true if this is a configuration cycle.
    pub fn is_configure(&self) -> bool {
        self.origin.is_some()
    }
}

/// The outcome of one cycle as delivered by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerResponse {
    /// Protocol error attached by the server ([`ProtocolError::none`] on success).
    pub error: ProtocolError,
    /// When the transport received the response.
    pub timestamp: SystemTime,
}

impl ServerResponse {
    /// Creates a response.
    pub fn new(error: ProtocolError, timestamp: SystemTime) -> Self {
        Self { error, timestamp }
    }

    /// Creates a successful response stamped now.
    pub fn success() -> Self {
        Self::new(ProtocolError::none(), SystemTime::now())
    }

    /// Creates a response carrying `error`, stamped now.
    pub fn failure(error: ProtocolError) -> Self {
        Self::new(error, SystemTime::now())
    }
}

/// A sync transport carries cycles to the server.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, in-process fake server, mock for testing, etc.).
/// Implementations must deliver at most one response per request.
pub trait SyncTransport: Send + Sync {
    /// Sends one cycle and returns the server's response.
    fn send(&self, request: &CycleRequest) -> SyncResult<ServerResponse>;

    /// Checks if the transport is connected.
    fn is_connected(&self) -> bool;

    /// Closes the transport connection.
    fn close(&self) -> SyncResult<()>;
}

/// A mock transport replaying scripted responses in order.
#[derive(Debug)]
pub struct MockTransport {
    connected: AtomicBool,
    responses: Mutex<VecDeque<SyncResult<ServerResponse>>>,
    requests: Mutex<Vec<CycleRequest>>,
}

impl MockTransport {
    /// Creates a new mock transport with nothing queued.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues a server response.
    pub fn push_response(&self, response: ServerResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    /// Queues a response carrying `error`.
    pub fn push_error(&self, error: ProtocolError) {
        self.push_response(ServerResponse::failure(error));
    }

    /// Queues a successful response.
    pub fn push_success(&self) {
        self.push_response(ServerResponse::success());
    }

    /// Queues a transport failure.
    pub fn push_failure(&self, error: SyncError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Number of queued responses.
    pub fn pending(&self) -> usize {
        self.responses.lock().len()
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CycleRequest> {
        self.requests.lock().clone()
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncTransport for MockTransport {
    fn send(&self, request: &CycleRequest) -> SyncResult<ServerResponse> {
        if !self.is_connected() {
            return Err(SyncError::transport_retryable("not connected to server"));
        }
        self.requests.lock().push(request.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(SyncError::Protocol("no mock response queued".into())))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn close(&self) -> SyncResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncward_protocol::ErrorType;

    fn request() -> CycleRequest {
        CycleRequest {
            session_id: Uuid::new_v4(),
            types: DataTypeSet::all(),
            origin: None,
        }
    }

    #[test]
    fn mock_transport_connection() {
        let transport = MockTransport::new();
        assert!(transport.is_connected());

        transport.set_connected(false);
        assert!(!transport.is_connected());

        transport.set_connected(true);
        transport.close().unwrap();
        assert!(!transport.is_connected());
    }

    #[test]
    fn mock_transport_not_connected_error() {
        let transport = MockTransport::new();
        transport.set_connected(false);

        let result = transport.send(&request());
        assert!(matches!(result, Err(SyncError::Transport { retryable: true, .. })));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn mock_transport_replays_in_order() {
        let transport = MockTransport::new();
        transport.push_error(ProtocolError::new(ErrorType::TransientError));
        transport.push_success();
        assert_eq!(transport.pending(), 2);

        let first = transport.send(&request()).unwrap();
        assert_eq!(first.error.error_type, ErrorType::TransientError);

        let second = transport.send(&request()).unwrap();
        assert!(!second.error.is_error());

        assert!(matches!(
            transport.send(&request()),
            Err(SyncError::Protocol(_))
        ));
        assert_eq!(transport.requests().len(), 3);
    }

    #[test]
    fn configure_requests() {
        let mut req = request();
        assert!(!req.is_configure());
        req.origin = Some(GetUpdatesOrigin::NewClient);
        assert!(req.is_configure());
    }
}
