//! Engine status surface.
//!
//! The surface owns the single [`EngineStatus`] record of a session, paired
//! with the [`EngineState`] it belongs to, and hands out copies of it. Every
//! update swaps state and status together, so readers never observe a torn
//! write. After the swap, the surface:
//! - feeds the new status to every pending wait
//! - calls registered observers synchronously, in registration order
//!
//! Each wait owns a channel, so a status that is published and then
//! immediately superseded is still evaluated by every waiter.
//!
//! Closing the surface (session teardown) cancels every pending wait.

use crate::engine::EngineState;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use syncward_protocol::ProtocolError;
use tokio::sync::mpsc as async_mpsc;

/// Observable state of a sync session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    /// The protocol error from the most recent cycle.
    pub last_protocol_error: ProtocolError,
    /// Whether sync is enabled for the account.
    pub sync_enabled: bool,
    /// Whether the session hit an error the client cannot recover from.
    pub unrecoverable_error: bool,
    /// Whether initial setup or a reconfiguration is still pending.
    pub setup_in_progress: bool,
}

impl EngineStatus {
    /// Status of a session entering setup.
    pub fn setting_up() -> Self {
        Self {
            setup_in_progress: true,
            ..Self::default()
        }
    }

    /// Returns true if the server sent an explicit action that stopped the session.
    pub fn has_actionable_error(&self) -> bool {
        self.unrecoverable_error && self.last_protocol_error.action.is_explicit()
    }

    /// Returns true if the user must intervene ("sync paused").
    pub fn needs_attention(&self) -> bool {
        !self.sync_enabled || self.unrecoverable_error
    }
}

impl Default for EngineStatus {
    fn default() -> Self {
        Self {
            last_protocol_error: ProtocolError::none(),
            sync_enabled: true,
            unrecoverable_error: false,
            setup_in_progress: false,
        }
    }
}

/// Result of waiting for a status condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The predicate became true.
    Satisfied,
    /// The timeout elapsed first.
    TimedOut,
    /// The session was torn down while waiting.
    Cancelled,
}

impl WaitOutcome {
    /// Returns true if the predicate was satisfied.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, WaitOutcome::Satisfied)
    }
}

type Observer = Arc<dyn Fn(&EngineStatus) + Send + Sync>;

/// Sending half of one pending wait.
enum WaiterTx {
    Blocking(mpsc::Sender<Arc<EngineStatus>>),
    Async(async_mpsc::UnboundedSender<Arc<EngineStatus>>),
}

impl WaiterTx {
    /// Returns false once the wait has finished and dropped its receiver.
    fn send(&self, status: &Arc<EngineStatus>) -> bool {
        match self {
            WaiterTx::Blocking(tx) => tx.send(Arc::clone(status)).is_ok(),
            WaiterTx::Async(tx) => tx.send(Arc::clone(status)).is_ok(),
        }
    }
}

struct Waiter {
    id: u64,
    tx: WaiterTx,
}

/// Removes a wait from the surface when the wait returns.
struct WaitGuard<'a> {
    surface: &'a StatusSurface,
    id: u64,
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.surface.waiters.lock().retain(|w| w.id != self.id);
    }
}

struct Published {
    state: EngineState,
    status: Arc<EngineStatus>,
}

/// Holds the latest status and notifies interested parties of changes.
pub struct StatusSurface {
    current: RwLock<Published>,
    observers: RwLock<Vec<Observer>>,
    /// Pending waits. Held across the swap in `publish` so a wait registers
    /// either before a status (and receives it) or after it (and reads it).
    waiters: Mutex<Vec<Waiter>>,
    next_waiter: AtomicU64,
    closed: AtomicBool,
}

impl StatusSurface {
    /// Creates a surface holding `initial` for an engine in `state`.
    pub fn new(state: EngineState, initial: EngineStatus) -> Self {
        Self {
            current: RwLock::new(Published {
                state,
                status: Arc::new(initial),
            }),
            observers: RwLock::new(Vec::new()),
            waiters: Mutex::new(Vec::new()),
            next_waiter: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns a copy of the current status.
    pub fn snapshot(&self) -> EngineStatus {
        self.current.read().status.as_ref().clone()
    }

    /// Returns the engine state the current status was published with.
    pub fn state(&self) -> EngineState {
        self.current.read().state
    }

    /// Returns the state and a copy of the status, read together.
    pub fn snapshot_with_state(&self) -> (EngineState, EngineStatus) {
        let current = self.current.read();
        (current.state, current.status.as_ref().clone())
    }

    fn current(&self) -> Arc<EngineStatus> {
        Arc::clone(&self.current.read().status)
    }

    /// Registers an observer called after every update.
    ///
    /// Observers run on the updating thread, in registration order.
    pub fn add_observer<F>(&self, observer: F)
    where
        F: Fn(&EngineStatus) + Send + Sync + 'static,
    {
        self.observers.write().push(Arc::new(observer));
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Number of waits currently pending.
    pub fn waiter_count(&self) -> usize {
        self.waiters.lock().len()
    }

    /// Returns true once the surface has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Replaces state and status, then notifies waiters and observers.
    pub(crate) fn publish(&self, state: EngineState, status: EngineStatus) {
        let status = Arc::new(status);

        {
            let mut waiters = self.waiters.lock();
            *self.current.write() = Published {
                state,
                status: Arc::clone(&status),
            };
            waiters.retain(|w| w.tx.send(&status));
        }

        // Clone the list so an observer may register another observer.
        let observers: Vec<Observer> = self.observers.read().clone();
        for observer in observers {
            observer(&status);
        }
    }

    /// Cancels all current and future waits.
    pub(crate) fn close(&self) {
        let mut waiters = self.waiters.lock();
        self.closed.store(true, Ordering::SeqCst);
        // Dropping the senders disconnects every pending wait.
        waiters.clear();
    }

    /// Adds a wait and returns the status it must check first.
    ///
    /// Returns `None` if the surface is closed.
    fn register(&self, tx: WaiterTx) -> Option<(WaitGuard<'_>, Arc<EngineStatus>)> {
        let mut waiters = self.waiters.lock();
        if self.is_closed() {
            return None;
        }
        let id = self.next_waiter.fetch_add(1, Ordering::Relaxed);
        waiters.push(Waiter { id, tx });
        Some((WaitGuard { surface: self, id }, self.current()))
    }

    /// Blocks until `predicate` holds, the timeout elapses, or the surface closes.
    ///
    /// The predicate is evaluated against the current status, then against
    /// every status published while waiting, and once more after the
    /// deadline before reporting [`WaitOutcome::TimedOut`].
    pub fn wait_until<P>(&self, predicate: P, timeout: Duration) -> WaitOutcome
    where
        P: Fn(&EngineStatus) -> bool,
    {
        let (tx, rx) = mpsc::channel();
        let Some((_guard, current)) = self.register(WaiterTx::Blocking(tx)) else {
            return WaitOutcome::Cancelled;
        };
        if predicate(&current) {
            return WaitOutcome::Satisfied;
        }

        let deadline = Instant::now().checked_add(timeout);
        loop {
            let received = match deadline {
                Some(deadline) => {
                    rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(status) if predicate(&status) => return WaitOutcome::Satisfied,
                Ok(_) => {}
                Err(RecvTimeoutError::Disconnected) => return WaitOutcome::Cancelled,
                Err(RecvTimeoutError::Timeout) => {
                    if rx.try_iter().any(|status| predicate(&status)) {
                        return WaitOutcome::Satisfied;
                    }
                    return self.final_check(&predicate);
                }
            }
        }
    }

    /// Async counterpart of [`StatusSurface::wait_until`].
    pub async fn wait_for<P>(&self, predicate: P, timeout: Duration) -> WaitOutcome
    where
        P: Fn(&EngineStatus) -> bool,
    {
        let (tx, mut rx) = async_mpsc::unbounded_channel();
        let Some((_guard, current)) = self.register(WaiterTx::Async(tx)) else {
            return WaitOutcome::Cancelled;
        };
        if predicate(&current) {
            return WaitOutcome::Satisfied;
        }

        let waited = tokio::time::timeout(timeout, async {
            while let Some(status) = rx.recv().await {
                if predicate(&status) {
                    return WaitOutcome::Satisfied;
                }
            }
            WaitOutcome::Cancelled
        })
        .await;

        match waited {
            Ok(outcome) => outcome,
            Err(_) => {
                while let Ok(status) = rx.try_recv() {
                    if predicate(&status) {
                        return WaitOutcome::Satisfied;
                    }
                }
                self.final_check(&predicate)
            }
        }
    }

    fn final_check<P>(&self, predicate: &P) -> WaitOutcome
    where
        P: Fn(&EngineStatus) -> bool,
    {
        if self.is_closed() {
            WaitOutcome::Cancelled
        } else if predicate(&self.current()) {
            WaitOutcome::Satisfied
        } else {
            WaitOutcome::TimedOut
        }
    }
}

impl Default for StatusSurface {
    fn default() -> Self {
        Self::new(EngineState::Stopped, EngineStatus::default())
    }
}

impl std::fmt::Debug for StatusSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusSurface")
            .field("state", &self.state())
            .field("current", &self.current())
            .field("observers", &self.observer_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}
