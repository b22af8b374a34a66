//! In-process fake sync server.
//!
//! The fake server answers every cycle with success unless an error has
//! been triggered. Triggered errors are injected according to an
//! [`ErrorFrequency`], which lets tests model flaky servers as well as
//! servers that have permanently turned a client away.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::SystemTime;
use syncward_engine::{CycleRequest, ServerResponse, SyncError, SyncResult, SyncTransport};
use syncward_protocol::{ErrorType, ProtocolError};
use tracing::debug;

/// How often a triggered error is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFrequency {
    /// Every request fails.
    Always,
    /// The first two of every three requests fail.
    TwoThirds,
    /// No request fails.
    Never,
}

impl ErrorFrequency {
    /// Returns true if the request at `index` (counted from the trigger) fails.
    pub fn fails(&self, index: usize) -> bool {
        match self {
            ErrorFrequency::Always => true,
            ErrorFrequency::TwoThirds => index % 3 != 2,
            ErrorFrequency::Never => false,
        }
    }
}

#[derive(Debug, Clone)]
struct TriggeredError {
    error: ProtocolError,
    frequency: ErrorFrequency,
    served: usize,
}

/// A fake server implementing [`SyncTransport`].
#[derive(Debug)]
pub struct FakeServer {
    triggered: Mutex<Option<TriggeredError>>,
    requests: Mutex<Vec<CycleRequest>>,
    request_count: AtomicUsize,
    connected: AtomicBool,
}

impl FakeServer {
    /// Creates a server that answers every cycle with success.
    pub fn new() -> Self {
        Self {
            triggered: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            request_count: AtomicUsize::new(0),
            connected: AtomicBool::new(true),
        }
    }

    /// Injects `error` into subsequent responses at the given frequency.
    pub fn trigger_sync_error(&self, error: ProtocolError, frequency: ErrorFrequency) {
        debug!(%error, ?frequency, "fake server error triggered");
        *self.triggered.lock() = Some(TriggeredError {
            error,
            frequency,
            served: 0,
        });
    }

    /// Makes every subsequent response a plain `NOT_MY_BIRTHDAY` error.
    pub fn trigger_birthday_error(&self) {
        self.trigger_sync_error(
            ProtocolError::new(ErrorType::NotMyBirthday),
            ErrorFrequency::Always,
        );
    }

    /// Stops injecting errors.
    pub fn clear_error(&self) {
        *self.triggered.lock() = None;
    }

    /// Number of requests served so far.
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Requests served so far, oldest first.
    pub fn requests(&self) -> Vec<CycleRequest> {
        self.requests.lock().clone()
    }

    /// Simulates a network partition.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    fn next_error(&self) -> ProtocolError {
        let mut triggered = self.triggered.lock();
        match triggered.as_mut() {
            Some(t) => {
                let fails = t.frequency.fails(t.served);
                t.served += 1;
                if fails {
                    t.error.clone()
                } else {
                    ProtocolError::none()
                }
            }
            None => ProtocolError::none(),
        }
    }
}

impl Default for FakeServer {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncTransport for FakeServer {
    fn send(&self, request: &CycleRequest) -> SyncResult<ServerResponse> {
        if !self.is_connected() {
            return Err(SyncError::transport_retryable("fake server unreachable"));
        }

        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        Ok(ServerResponse::new(self.next_error(), SystemTime::now()))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn close(&self) -> SyncResult<()> {
        self.set_connected(false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncward_protocol::{ClientAction, DataTypeSet};

    fn request() -> CycleRequest {
        CycleRequest {
            session_id: Default::default(),
            types: DataTypeSet::all(),
            origin: None,
        }
    }

    #[test]
    fn two_thirds_pattern() {
        let pattern: Vec<bool> = (0..6).map(|i| ErrorFrequency::TwoThirds.fails(i)).collect();
        assert_eq!(pattern, vec![true, true, false, true, true, false]);
        assert!(ErrorFrequency::Always.fails(2));
        assert!(!ErrorFrequency::Never.fails(0));
    }

    #[test]
    fn succeeds_by_default() {
        let server = FakeServer::new();
        let response = server.send(&request()).unwrap();
        assert!(!response.error.is_error());
        assert_eq!(server.request_count(), 1);
    }

    #[test]
    fn triggered_error_counts_from_trigger() {
        let server = FakeServer::new();
        server.send(&request()).unwrap();

        let error = ProtocolError::new(ErrorType::TransientError)
            .with_action(ClientAction::UpgradeClient);
        server.trigger_sync_error(error.clone(), ErrorFrequency::TwoThirds);

        let errors: Vec<ProtocolError> = (0..3)
            .map(|_| server.send(&request()).unwrap().error)
            .collect();
        assert_eq!(errors[0], error);
        assert_eq!(errors[1], error);
        assert!(!errors[2].is_error());

        server.clear_error();
        assert!(!server.send(&request()).unwrap().error.is_error());
        assert_eq!(server.request_count(), 5);
    }

    #[test]
    fn unreachable_server_is_retryable() {
        let server = FakeServer::new();
        server.close().unwrap();
        let err = server.send(&request()).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(server.request_count(), 0);
    }
}
