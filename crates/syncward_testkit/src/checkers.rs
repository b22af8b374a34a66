//! Status conditions and waiting helpers.
//!
//! A [`StatusCondition`] is a named predicate over an [`EngineStatus`]
//! snapshot. Tests block on a condition with [`await_condition`], which
//! re-evaluates it after every status update.

use std::fmt;
use std::time::Duration;
use syncward_engine::{EngineStatus, SyncEngine, WaitOutcome};
use syncward_protocol::ClientAction;
use tracing::warn;

/// Default time to wait for a condition.
pub const DEFAULT_AWAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// A named predicate over the engine status.
#[derive(Clone, Copy)]
pub struct StatusCondition {
    name: &'static str,
    predicate: fn(&EngineStatus) -> bool,
}

impl StatusCondition {
    /// Creates a condition.
    pub const fn new(name: &'static str, predicate: fn(&EngineStatus) -> bool) -> Self {
        Self { name, predicate }
    }

    /// Name shown when waiting for the condition times out.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Evaluates the condition.
    pub fn is_satisfied(&self, status: &EngineStatus) -> bool {
        (self.predicate)(status)
    }
}

impl fmt::Debug for StatusCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StatusCondition").field(&self.name).finish()
    }
}

/// Sync is off and no setup is pending.
pub fn sync_disabled(status: &EngineStatus) -> bool {
    !status.sync_enabled && !status.setup_in_progress
}

/// The server sent an explicit action and the session cannot continue.
pub fn actionable_error(status: &EngineStatus) -> bool {
    status.last_protocol_error.action != ClientAction::UnknownAction
        && status.unrecoverable_error
}

/// Setup finished without an unrecoverable error.
pub fn setup_completed(status: &EngineStatus) -> bool {
    !status.setup_in_progress && status.sync_enabled && !status.unrecoverable_error
}

/// Waits until sync is disabled.
pub const SYNC_DISABLED: StatusCondition = StatusCondition::new("Sync Disabled", sync_disabled);

/// Waits for an actionable error.
pub const ACTIONABLE_ERROR: StatusCondition =
    StatusCondition::new("ActionableErrorChecker", actionable_error);

/// Waits for setup to complete.
pub const SETUP_COMPLETED: StatusCondition =
    StatusCondition::new("Setup Completed", setup_completed);

/// Blocks until `condition` holds on `engine` or `timeout` elapses.
///
/// Returns true if the condition was satisfied.
pub fn await_condition(engine: &SyncEngine, condition: StatusCondition, timeout: Duration) -> bool {
    let outcome = engine.subscribe(|status| condition.is_satisfied(status), timeout);
    if outcome != WaitOutcome::Satisfied {
        warn!(
            condition = condition.name(),
            ?outcome,
            status = ?engine.status(),
            "status condition not reached"
        );
    }
    outcome.is_satisfied()
}

/// [`await_condition`] with [`DEFAULT_AWAIT_TIMEOUT`].
pub fn await_sync_disabled(engine: &SyncEngine) -> bool {
    await_condition(engine, SYNC_DISABLED, DEFAULT_AWAIT_TIMEOUT)
}

/// [`await_condition`] with [`DEFAULT_AWAIT_TIMEOUT`].
pub fn await_actionable_error(engine: &SyncEngine) -> bool {
    await_condition(engine, ACTIONABLE_ERROR, DEFAULT_AWAIT_TIMEOUT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncward_protocol::{ErrorType, ProtocolError};

    #[test]
    fn default_status_matches_nothing_terminal() {
        let status = EngineStatus::default();
        assert!(!sync_disabled(&status));
        assert!(!actionable_error(&status));
        assert!(setup_completed(&status));
    }

    #[test]
    fn disabled_during_setup_is_not_disabled() {
        let status = EngineStatus {
            sync_enabled: false,
            setup_in_progress: true,
            ..EngineStatus::default()
        };
        assert!(!sync_disabled(&status));
    }

    #[test]
    fn actionable_needs_unrecoverable() {
        let mut status = EngineStatus {
            last_protocol_error: ProtocolError::new(ErrorType::TransientError)
                .with_action(ClientAction::UpgradeClient),
            ..EngineStatus::default()
        };
        assert!(!ACTIONABLE_ERROR.is_satisfied(&status));

        status.unrecoverable_error = true;
        assert!(ACTIONABLE_ERROR.is_satisfied(&status));
        assert_eq!(ACTIONABLE_ERROR.name(), "ActionableErrorChecker");
    }
}
