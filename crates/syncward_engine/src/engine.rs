//! Sync session engine.

use crate::classify::classify;
use crate::config::EngineConfig;
use crate::error::{SyncError, SyncResult};
use crate::policy::{Directive, EngineMode, ReactionPolicy};
use crate::status::{EngineStatus, StatusSurface, WaitOutcome};
use crate::transport::{CycleRequest, ServerResponse, SyncTransport};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};
use syncward_protocol::{
    DataType, DataTypeSet, EventLog, GetUpdatesOrigin, ProtocolError, ProtocolEvent,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Engine-level state of a sync session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    /// Created but setup has not been started.
    Stopped,
    /// Completing first-time setup.
    SettingUp,
    /// Steady-state operation.
    Running,
    /// Sync was turned off by the server or the user.
    Disabled,
    /// The client cannot continue (e.g. it must be upgraded).
    Unrecoverable,
}

impl EngineState {
    /// Returns true if the engine accepts server responses.
    pub fn is_active(&self) -> bool {
        matches!(self, EngineState::SettingUp | EngineState::Running)
    }

    /// Returns true if only an explicit re-enable can leave this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineState::Disabled | EngineState::Unrecoverable)
    }

    /// Returns the policy mode for this state.
    pub fn mode(&self) -> EngineMode {
        match self {
            EngineState::Stopped | EngineState::SettingUp => EngineMode::FirstTimeSetup,
            EngineState::Running | EngineState::Disabled | EngineState::Unrecoverable => {
                EngineMode::Running
            }
        }
    }
}

/// Counters describing a session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStats {
    /// Server responses applied by the policy.
    pub responses_applied: u64,
    /// Server responses ignored because the engine was inactive.
    pub responses_ignored: u64,
    /// Transient errors seen.
    pub transient_errors: u64,
    /// Transient streaks escalated to a disable.
    pub escalations: u64,
    /// Cycles that failed in the transport.
    pub transport_failures: u64,
}

/// A sync session: owns the engine status and reacts to server responses.
///
/// Session control and response delivery run one at a time under the
/// session lock; status reads and waits may happen from any thread.
/// Observers run while the lock is held, so they may read the engine or
/// call back into it on the same thread.
pub struct SyncEngine {
    config: EngineConfig,
    session_id: Uuid,
    /// Held from reading the state until the new state and status are published.
    session: ReentrantMutex<()>,
    policy: Mutex<ReactionPolicy>,
    surface: StatusSurface,
    preferred_types: RwLock<DataTypeSet>,
    events: Mutex<EventLog>,
    stats: RwLock<EngineStats>,
    shut_down: AtomicBool,
}

impl SyncEngine {
    /// Creates a new engine in the [`EngineState::Stopped`] state.
    pub fn new(config: EngineConfig) -> SyncResult<Self> {
        config.validate()?;

        let session_id = Uuid::new_v4();
        debug!(session = %session_id, "sync engine created");

        Ok(Self {
            policy: Mutex::new(ReactionPolicy::new(
                config.retry.clone(),
                config.escalation,
            )),
            preferred_types: RwLock::new(config.initial_types.clone()),
            events: Mutex::new(EventLog::with_capacity(config.event_history)),
            config,
            session_id,
            session: ReentrantMutex::new(()),
            surface: StatusSurface::new(EngineState::Stopped, EngineStatus::default()),
            stats: RwLock::new(EngineStats::default()),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Returns the session identifier.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Gets the current state.
    pub fn state(&self) -> EngineState {
        self.surface.state()
    }

    /// Gets the current policy mode.
    pub fn mode(&self) -> EngineMode {
        self.state().mode()
    }

    /// Returns a snapshot of the status.
    pub fn status(&self) -> EngineStatus {
        self.surface.snapshot()
    }

    /// Returns the state and a status snapshot, read together.
    pub fn state_and_status(&self) -> (EngineState, EngineStatus) {
        self.surface.snapshot_with_state()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> EngineStats {
        self.stats.read().clone()
    }

    /// Returns the status surface for observers.
    pub fn surface(&self) -> &StatusSurface {
        &self.surface
    }

    /// Number of consecutive transient errors in the current streak.
    pub fn transient_streak(&self) -> u32 {
        self.policy.lock().transient_streak()
    }

    /// Returns the data types currently enabled.
    pub fn preferred_types(&self) -> DataTypeSet {
        self.preferred_types.read().clone()
    }

    /// Returns up to `limit` of the most recent protocol events, oldest first.
    pub fn events(&self, limit: usize) -> Vec<ProtocolEvent> {
        self.events.lock().recent(limit)
    }

    /// Returns true once [`SyncEngine::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> SyncResult<()> {
        if self.is_shut_down() {
            Err(SyncError::SessionClosed)
        } else {
            Ok(())
        }
    }

    /// Publishes `to` and `status` as one update. Callers hold the session lock.
    fn commit(&self, to: EngineState, status: EngineStatus) {
        let from = self.surface.state();
        if from != to {
            info!(session = %self.session_id, ?from, ?to, "engine state changed");
        }
        self.surface.publish(to, status);
    }

    /// Starts first-time setup.
    pub fn start_setup(&self) -> SyncResult<()> {
        let _session = self.session.lock();
        self.ensure_open()?;

        let state = self.state();
        if state != EngineState::Stopped {
            return Err(SyncError::invalid_transition(state, "start_setup"));
        }

        self.policy.lock().reset();
        self.commit(EngineState::SettingUp, EngineStatus::setting_up());
        Ok(())
    }

    /// Clears a disabled or unrecoverable session back to setup.
    ///
    /// The status is reset to the fresh-start defaults with setup in progress.
    pub fn reenable(&self) -> SyncResult<()> {
        let _session = self.session.lock();
        self.ensure_open()?;

        let state = self.state();
        if !state.is_terminal() {
            return Err(SyncError::invalid_transition(state, "reenable"));
        }

        self.policy.lock().reset();
        self.commit(EngineState::SettingUp, EngineStatus::setting_up());
        Ok(())
    }

    /// Explicit user-driven enable or disable.
    ///
    /// Disabling moves any state to [`EngineState::Disabled`]. Enabling a
    /// stopped session starts setup and enabling a disabled or unrecoverable
    /// one re-enables it; enabling an active session does nothing.
    pub fn set_enabled(&self, enabled: bool) -> SyncResult<()> {
        let _session = self.session.lock();
        self.ensure_open()?;

        let state = self.state();
        if enabled {
            return match state {
                EngineState::Stopped => self.start_setup(),
                EngineState::Disabled | EngineState::Unrecoverable => self.reenable(),
                EngineState::SettingUp | EngineState::Running => Ok(()),
            };
        }

        if state == EngineState::Disabled {
            return Ok(());
        }

        self.policy.lock().reset();
        let status = EngineStatus {
            sync_enabled: false,
            setup_in_progress: false,
            ..self.surface.snapshot()
        };
        self.commit(EngineState::Disabled, status);
        Ok(())
    }

    /// Stops syncing a data type. Returns true if it was enabled.
    ///
    /// Does not change the engine-level enabled state.
    pub fn disable_datatype(&self, data_type: DataType) -> bool {
        let removed = self.preferred_types.write().remove(data_type);
        if removed {
            info!(session = %self.session_id, %data_type, "data type disabled");
        }
        removed
    }

    /// Starts syncing a data type. Returns true if it was disabled.
    ///
    /// On a running session this starts a reconfiguration: setup is held
    /// in progress until the next successful cycle.
    pub fn enable_datatype(&self, data_type: DataType) -> bool {
        let inserted = self.preferred_types.write().insert(data_type);
        if !inserted {
            return false;
        }

        info!(session = %self.session_id, %data_type, "data type enabled");
        let _session = self.session.lock();
        if self.state() == EngineState::Running && !self.is_shut_down() {
            let status = EngineStatus {
                setup_in_progress: true,
                ..self.surface.snapshot()
            };
            self.commit(EngineState::Running, status);
        }
        true
    }

    /// Feeds one server response into the classifier and reaction policy.
    ///
    /// Never fails. Responses arriving while the engine is not active are
    /// logged and ignored, and the engine is told to halt.
    pub fn on_server_response(&self, error: ProtocolError, source_timestamp: SystemTime) -> Directive {
        let response = ServerResponse::new(error, source_timestamp);
        self.events.lock().record(ProtocolEvent::ServerResponse {
            timestamp: source_timestamp,
            error: response.error.clone(),
        });

        let _session = self.session.lock();
        let state = self.state();
        if self.is_shut_down() || !state.is_active() {
            warn!(
                session = %self.session_id,
                ?state,
                error = %response.error,
                "ignoring server response for inactive session"
            );
            self.stats.write().responses_ignored += 1;
            return Directive::Halt;
        }

        let outcome = classify(&response.error);
        let current = self.surface.snapshot();
        let reaction = self
            .policy
            .lock()
            .apply(outcome, &response, state.mode(), &current);

        debug!(
            session = %self.session_id,
            ?outcome,
            directive = ?reaction.directive,
            "applied server response"
        );
        if reaction.escalated {
            warn!(
                session = %self.session_id,
                threshold = self.config.escalation.threshold,
                "transient errors exceeded escalation threshold, disabling sync"
            );
        }

        {
            let mut stats = self.stats.write();
            stats.responses_applied += 1;
            if matches!(reaction.directive, Directive::Backoff { .. }) || reaction.escalated {
                stats.transient_errors += 1;
            }
            if reaction.escalated {
                stats.escalations += 1;
            }
        }

        self.commit(reaction.state, reaction.status);
        reaction.directive
    }

    fn next_request(&self, state: EngineState) -> CycleRequest {
        let retrying = self.transient_streak() > 0;
        let origin = match state {
            EngineState::SettingUp if retrying => Some(GetUpdatesOrigin::Retry),
            EngineState::SettingUp => Some(GetUpdatesOrigin::NewClient),
            EngineState::Running if self.surface.snapshot().setup_in_progress => Some(if retrying {
                GetUpdatesOrigin::Retry
            } else {
                GetUpdatesOrigin::Reconfiguration
            }),
            _ => None,
        };

        CycleRequest {
            session_id: self.session_id,
            types: self.preferred_types(),
            origin,
        }
    }

    /// Runs one request/response cycle through `transport`.
    ///
    /// Transport failures are returned as errors and leave the status untouched.
    pub fn run_cycle<T: SyncTransport + ?Sized>(&self, transport: &T) -> SyncResult<Directive> {
        self.ensure_open()?;

        let state = self.state();
        if !state.is_active() {
            return Err(SyncError::invalid_transition(state, "sync cycle"));
        }

        let request = self.next_request(state);
        let now = SystemTime::now();
        let event = match request.origin {
            Some(origin) => ProtocolEvent::ConfigureRequest {
                timestamp: now,
                origin,
                types: request.types.clone(),
            },
            None => ProtocolEvent::NormalRequest {
                timestamp: now,
                types: request.types.clone(),
            },
        };
        self.events.lock().record(event);

        let response = transport.send(&request).inspect_err(|e| {
            warn!(session = %self.session_id, error = %e, "transport failed");
            self.stats.write().transport_failures += 1;
        })?;

        Ok(self.on_server_response(response.error, response.timestamp))
    }

    /// Runs cycles until the engine may continue, must halt, or the retry
    /// budget is spent.
    ///
    /// Sleeps for each backoff delay between attempts. Retryable transport
    /// failures are retried with the same budget.
    pub fn sync_with_retry<T: SyncTransport + ?Sized>(&self, transport: &T) -> SyncResult<Directive> {
        let retry = &self.config.retry;
        let mut last_backoff = None;

        for attempt in 0..retry.max_attempts {
            let is_last = attempt + 1 >= retry.max_attempts;

            match self.run_cycle(transport) {
                Ok(Directive::Backoff { attempt, delay }) => {
                    last_backoff = Some(Directive::Backoff { attempt, delay });
                    if !is_last {
                        std::thread::sleep(delay);
                    }
                }
                Ok(directive) => return Ok(directive),
                Err(e) if e.is_retryable() && !is_last => {
                    std::thread::sleep(retry.delay_for_attempt(attempt + 1));
                }
                Err(e) => return Err(e),
            }
        }

        last_backoff.ok_or_else(|| SyncError::Protocol("no sync attempts made".into()))
    }

    /// Registers an observer called synchronously after every status update.
    ///
    /// The observer runs on the updating thread with the session lock held.
    pub fn add_observer<F>(&self, observer: F)
    where
        F: Fn(&EngineStatus) + Send + Sync + 'static,
    {
        self.surface.add_observer(observer);
    }

    /// Blocks until `predicate` holds over the status, `timeout` elapses, or
    /// the session is shut down.
    pub fn subscribe<P>(&self, predicate: P, timeout: Duration) -> WaitOutcome
    where
        P: Fn(&EngineStatus) -> bool,
    {
        self.surface.wait_until(predicate, timeout)
    }

    /// Async counterpart of [`SyncEngine::subscribe`].
    pub async fn wait_for<P>(&self, predicate: P, timeout: Duration) -> WaitOutcome
    where
        P: Fn(&EngineStatus) -> bool,
    {
        self.surface.wait_for(predicate, timeout).await
    }

    /// Tears the session down, cancelling every pending wait.
    pub fn shutdown(&self) {
        let _session = self.session.lock();
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            info!(session = %self.session_id, "sync session shut down");
            self.surface.close();
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("session_id", &self.session_id)
            .field("state", &self.state())
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EscalationConfig, RetryConfig};
    use crate::transport::MockTransport;
    use std::sync::Arc;
    use std::thread;
    use syncward_protocol::{ClientAction, ErrorType};

    fn config() -> EngineConfig {
        EngineConfig::new()
            .with_retry(RetryConfig::new(5).with_initial_delay(Duration::ZERO).with_jitter(false))
            .with_escalation(EscalationConfig::new(3, Duration::from_secs(60)))
    }

    fn running_engine() -> SyncEngine {
        let engine = SyncEngine::new(config()).unwrap();
        engine.start_setup().unwrap();
        engine.on_server_response(ProtocolError::none(), SystemTime::now());
        assert_eq!(engine.state(), EngineState::Running);
        engine
    }

    fn birthday() -> ProtocolError {
        ProtocolError::new(ErrorType::NotMyBirthday)
    }

    #[test]
    fn engine_state_checks() {
        assert!(EngineState::SettingUp.is_active());
        assert!(EngineState::Running.is_active());
        assert!(!EngineState::Stopped.is_active());
        assert!(!EngineState::Disabled.is_active());

        assert!(EngineState::Disabled.is_terminal());
        assert!(EngineState::Unrecoverable.is_terminal());
        assert!(!EngineState::Running.is_terminal());

        assert_eq!(EngineState::SettingUp.mode(), EngineMode::FirstTimeSetup);
        assert_eq!(EngineState::Running.mode(), EngineMode::Running);
    }

    #[test]
    fn engine_initial_state() {
        let engine = SyncEngine::new(config()).unwrap();
        assert_eq!(engine.state(), EngineState::Stopped);
        assert_eq!(engine.status(), EngineStatus::default());
        assert_eq!(engine.preferred_types(), DataTypeSet::all());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = config().with_escalation(EscalationConfig::new(0, Duration::ZERO));
        assert!(matches!(
            SyncEngine::new(config),
            Err(SyncError::InvalidConfig(_))
        ));
    }

    #[test]
    fn setup_completes_on_success() {
        let engine = SyncEngine::new(config()).unwrap();
        engine.start_setup().unwrap();
        assert!(engine.status().setup_in_progress);

        let directive = engine.on_server_response(ProtocolError::none(), SystemTime::now());
        assert_eq!(directive, Directive::Continue);
        assert_eq!(engine.state(), EngineState::Running);
        assert!(!engine.status().setup_in_progress);
    }

    #[test]
    fn start_setup_twice_fails() {
        let engine = running_engine();
        assert!(matches!(
            engine.start_setup(),
            Err(SyncError::InvalidStateTransition {
                from: EngineState::Running,
                ..
            })
        ));
    }

    #[test]
    fn responses_ignored_while_stopped() {
        let engine = SyncEngine::new(config()).unwrap();
        let directive = engine.on_server_response(birthday(), SystemTime::now());
        assert_eq!(directive, Directive::Halt);
        assert_eq!(engine.status(), EngineStatus::default());
        assert_eq!(engine.stats().responses_ignored, 1);
    }

    #[test]
    fn terminal_error_is_idempotent() {
        let engine = running_engine();
        engine.on_server_response(birthday(), SystemTime::now());
        let once = engine.status();

        engine.on_server_response(birthday(), SystemTime::now());
        assert_eq!(engine.status(), once);
        assert_eq!(engine.state(), EngineState::Disabled);
    }

    #[test]
    fn reenable_resets_to_setup() {
        let engine = running_engine();
        engine.on_server_response(
            ProtocolError::new(ErrorType::TransientError).with_action(ClientAction::UpgradeClient),
            SystemTime::now(),
        );
        assert_eq!(engine.state(), EngineState::Unrecoverable);

        engine.reenable().unwrap();
        assert_eq!(engine.state(), EngineState::SettingUp);
        assert_eq!(engine.status(), EngineStatus::setting_up());
    }

    #[test]
    fn reenable_requires_terminal_state() {
        let engine = running_engine();
        assert!(engine.reenable().is_err());
    }

    #[test]
    fn user_disable_and_enable() {
        let engine = running_engine();
        engine.set_enabled(false).unwrap();
        assert_eq!(engine.state(), EngineState::Disabled);
        assert!(!engine.status().sync_enabled);
        assert!(!engine.status().unrecoverable_error);

        engine.set_enabled(true).unwrap();
        assert_eq!(engine.state(), EngineState::SettingUp);
        assert!(engine.status().sync_enabled);
    }

    #[test]
    fn datatype_changes_keep_engine_state() {
        let engine = running_engine();

        assert!(engine.disable_datatype(DataType::Autofill));
        assert!(!engine.disable_datatype(DataType::Autofill));
        assert!(!engine.preferred_types().has(DataType::Autofill));
        assert_eq!(engine.state(), EngineState::Running);
        assert!(!engine.status().setup_in_progress);

        assert!(engine.enable_datatype(DataType::Autofill));
        assert_eq!(engine.state(), EngineState::Running);
        assert!(engine.status().setup_in_progress);
        assert!(engine.status().sync_enabled);
    }

    #[test]
    fn run_cycle_records_events() {
        let engine = SyncEngine::new(config()).unwrap();
        engine.start_setup().unwrap();

        let transport = MockTransport::new();
        transport.push_success();
        transport.push_success();

        engine.run_cycle(&transport).unwrap();
        engine.run_cycle(&transport).unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].origin, Some(GetUpdatesOrigin::NewClient));
        assert_eq!(requests[1].origin, None);

        let events = engine.events(10);
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].event_type(), "Initial GetUpdates request");
        assert_eq!(events[3].event_type(), "Server response");
    }

    #[test]
    fn transport_failure_leaves_status() {
        let engine = running_engine();
        let before = engine.status();

        let transport = MockTransport::new();
        transport.push_failure(SyncError::transport_fatal("tls handshake failed"));

        assert!(engine.run_cycle(&transport).is_err());
        assert_eq!(engine.status(), before);
        assert_eq!(engine.stats().transport_failures, 1);
    }

    #[test]
    fn run_cycle_requires_active_state() {
        let engine = SyncEngine::new(config()).unwrap();
        let transport = MockTransport::new();
        assert!(matches!(
            engine.run_cycle(&transport),
            Err(SyncError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn sync_with_retry_recovers() {
        let engine = running_engine();
        let transport = MockTransport::new();
        transport.push_error(ProtocolError::new(ErrorType::TransientError));
        transport.push_failure(SyncError::transport_retryable("connection reset"));
        transport.push_success();

        let directive = engine.sync_with_retry(&transport).unwrap();
        assert_eq!(directive, Directive::Continue);
        assert_eq!(transport.pending(), 0);
        assert_eq!(engine.transient_streak(), 0);
    }

    #[test]
    fn sync_with_retry_stops_on_halt() {
        let engine = running_engine();
        let transport = MockTransport::new();
        transport.push_error(birthday());
        transport.push_success();

        let directive = engine.sync_with_retry(&transport).unwrap();
        assert_eq!(directive, Directive::Halt);
        assert_eq!(transport.pending(), 1);
    }

    #[test]
    fn shutdown_cancels_waiters() {
        let engine = Arc::new(running_engine());
        let closer = Arc::clone(&engine);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            closer.shutdown();
        });

        let outcome = engine.subscribe(|s| !s.sync_enabled, Duration::from_secs(5));
        assert_eq!(outcome, WaitOutcome::Cancelled);
        handle.join().unwrap();

        assert!(matches!(engine.start_setup(), Err(SyncError::SessionClosed)));
    }

    fn coupled(state: EngineState, status: &EngineStatus) -> bool {
        match state {
            EngineState::Disabled => !status.sync_enabled,
            EngineState::SettingUp | EngineState::Running => {
                status.sync_enabled && !status.unrecoverable_error
            }
            EngineState::Stopped | EngineState::Unrecoverable => true,
        }
    }

    #[test]
    fn waiter_sees_disable_undone_by_reenable() {
        let engine = Arc::new(running_engine());
        let waiter = Arc::clone(&engine);

        let handle = thread::spawn(move || {
            waiter.subscribe(|s| !s.sync_enabled, Duration::from_secs(5))
        });
        while engine.surface().waiter_count() == 0 {
            thread::yield_now();
        }

        engine.on_server_response(birthday(), SystemTime::now());
        engine.reenable().unwrap();

        assert_eq!(handle.join().unwrap(), WaitOutcome::Satisfied);
        assert_eq!(engine.state(), EngineState::SettingUp);
    }

    #[test]
    fn user_disable_racing_responses_stays_coupled() {
        let engine = Arc::new(running_engine());
        let violations = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let weak = Arc::downgrade(&engine);
        let counter = Arc::clone(&violations);
        engine.add_observer(move |status: &EngineStatus| {
            if let Some(engine) = weak.upgrade() {
                if !coupled(engine.state(), status) {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        let responder = Arc::clone(&engine);
        let responses = thread::spawn(move || {
            for _ in 0..500 {
                responder.on_server_response(ProtocolError::none(), SystemTime::now());
            }
        });
        for _ in 0..500 {
            engine.set_enabled(false).unwrap();
            let (state, status) = engine.state_and_status();
            assert!(coupled(state, &status), "{state:?} with {status:?}");
            engine.set_enabled(true).unwrap();
        }
        responses.join().unwrap();

        let (state, status) = engine.state_and_status();
        assert!(coupled(state, &status), "{state:?} with {status:?}");
        assert_eq!(violations.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn datatype_enable_racing_birthday_keeps_sync_disabled() {
        for _ in 0..100 {
            let engine = Arc::new(running_engine());
            engine.disable_datatype(DataType::Bookmarks);

            let enabler = Arc::clone(&engine);
            let handle = thread::spawn(move || enabler.enable_datatype(DataType::Bookmarks));
            engine.on_server_response(birthday(), SystemTime::now());
            assert!(handle.join().unwrap());

            let (state, status) = engine.state_and_status();
            assert_eq!(state, EngineState::Disabled);
            assert!(!status.sync_enabled);
        }
    }

    #[test]
    fn observer_may_call_back_into_engine() {
        let engine = Arc::new(running_engine());
        let weak = Arc::downgrade(&engine);
        engine.add_observer(move |status: &EngineStatus| {
            if let Some(engine) = weak.upgrade() {
                if status.unrecoverable_error && engine.state() == EngineState::Unrecoverable {
                    engine.set_enabled(false).unwrap();
                }
            }
        });

        engine.on_server_response(
            ProtocolError::new(ErrorType::TransientError).with_action(ClientAction::UpgradeClient),
            SystemTime::now(),
        );
        assert_eq!(engine.state(), EngineState::Disabled);
        assert!(!engine.status().sync_enabled);
    }

    #[test]
    fn observers_notified_per_update() {
        let engine = running_engine();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        engine.add_observer(move |status: &EngineStatus| {
            seen_clone.lock().push(status.sync_enabled);
        });

        engine.on_server_response(ProtocolError::none(), SystemTime::now());
        engine.on_server_response(birthday(), SystemTime::now());

        assert_eq!(*seen.lock(), vec![true, false]);
    }
}
