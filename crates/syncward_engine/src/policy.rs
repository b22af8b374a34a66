//! Reaction policy: turns a classified outcome into a new status and a
//! directive for the engine loop.
//!
//! The policy is total: every outcome in every mode yields a valid status.
//! Its only memory is the current streak of transient errors, which it
//! uses to escalate retry storms into a client-side disable.

use crate::classify::{ClassifiedOutcome, RequiredAction};
use crate::config::{EscalationConfig, RetryConfig};
use crate::engine::EngineState;
use crate::status::EngineStatus;
use crate::transport::ServerResponse;
use std::time::{Duration, SystemTime};
use syncward_protocol::{ClientAction, ProtocolError};

/// Whether the session is completing initial configuration or running steady-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    /// Initial setup has not completed yet.
    FirstTimeSetup,
    /// Steady-state operation.
    Running,
}

/// What the engine loop should do after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Carry on at the normal cadence.
    Continue,
    /// Retry the in-flight operation after `delay`.
    Backoff {
        /// 1-based position in the current transient streak.
        attempt: u32,
        /// Suggested delay before retrying.
        delay: Duration,
    },
    /// Stop issuing requests until an explicit re-enable.
    Halt,
}

/// The full result of applying the policy to one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    /// The status to publish.
    pub status: EngineStatus,
    /// What the engine loop should do next.
    pub directive: Directive,
    /// The engine state after the cycle.
    pub state: EngineState,
    /// True if a transient streak was escalated to a disable.
    pub escalated: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct TransientStreak {
    count: u32,
    started_at: Option<SystemTime>,
}

/// Decides how the client reacts to each classified server response.
#[derive(Debug, Clone)]
pub struct ReactionPolicy {
    retry: RetryConfig,
    escalation: EscalationConfig,
    streak: TransientStreak,
}

impl ReactionPolicy {
    /// Creates a policy.
    pub fn new(retry: RetryConfig, escalation: EscalationConfig) -> Self {
        Self {
            retry,
            escalation,
            streak: TransientStreak::default(),
        }
    }

    /// Number of consecutive transient errors seen so far.
    pub fn transient_streak(&self) -> u32 {
        self.streak.count
    }

    /// Forgets the current transient streak.
    pub fn reset(&mut self) {
        self.streak = TransientStreak::default();
    }

    /// Applies a classified outcome.
    ///
    /// `response` is the raw server response the outcome was derived from;
    /// its error is recorded in the status and its timestamp drives the
    /// escalation window.
    pub fn apply(
        &mut self,
        outcome: ClassifiedOutcome,
        response: &ServerResponse,
        mode: EngineMode,
        current: &EngineStatus,
    ) -> Reaction {
        match outcome {
            ClassifiedOutcome::NoError => {
                self.reset();
                Reaction {
                    status: EngineStatus {
                        last_protocol_error: response.error.clone(),
                        setup_in_progress: false,
                        ..current.clone()
                    },
                    directive: Directive::Continue,
                    state: EngineState::Running,
                    escalated: false,
                }
            }
            ClassifiedOutcome::RetryableTransient => self.on_transient(response, mode, current),
            ClassifiedOutcome::BirthdayMismatch => {
                self.reset();
                Reaction {
                    status: EngineStatus {
                        last_protocol_error: response.error.clone(),
                        sync_enabled: false,
                        unrecoverable_error: true,
                        setup_in_progress: false,
                    },
                    directive: Directive::Halt,
                    state: EngineState::Disabled,
                    escalated: false,
                }
            }
            ClassifiedOutcome::ActionRequired(action) => {
                self.reset();
                Self::on_action(action, response.error.clone(), current, false)
            }
        }
    }

    fn on_transient(
        &mut self,
        response: &ServerResponse,
        mode: EngineMode,
        current: &EngineStatus,
    ) -> Reaction {
        let at = response.timestamp;
        let within_window = self.streak.started_at.is_some_and(|start| {
            at.duration_since(start)
                .map_or(true, |elapsed| elapsed <= self.escalation.window)
        });

        if within_window {
            self.streak.count += 1;
        } else {
            self.streak = TransientStreak {
                count: 1,
                started_at: Some(at),
            };
        }

        if self.streak.count >= self.escalation.threshold {
            self.reset();
            let mut error = response.error.clone();
            error.action = ClientAction::DisableSyncOnClient;
            return Self::on_action(RequiredAction::DisableSyncOnClient, error, current, true);
        }

        let attempt = self.streak.count;
        let setup_in_progress = match mode {
            EngineMode::FirstTimeSetup => true,
            EngineMode::Running => current.setup_in_progress,
        };
        let state = match mode {
            EngineMode::FirstTimeSetup => EngineState::SettingUp,
            EngineMode::Running => EngineState::Running,
        };

        Reaction {
            status: EngineStatus {
                last_protocol_error: response.error.clone(),
                setup_in_progress,
                ..current.clone()
            },
            directive: Directive::Backoff {
                attempt,
                delay: self.retry.delay_for_attempt(attempt),
            },
            state,
            escalated: false,
        }
    }

    fn on_action(
        action: RequiredAction,
        error: ProtocolError,
        current: &EngineStatus,
        escalated: bool,
    ) -> Reaction {
        let (sync_enabled, state) = if action.disables_sync() {
            (false, EngineState::Disabled)
        } else {
            (current.sync_enabled, EngineState::Unrecoverable)
        };

        Reaction {
            status: EngineStatus {
                last_protocol_error: error,
                sync_enabled,
                unrecoverable_error: true,
                setup_in_progress: false,
            },
            directive: Directive::Halt,
            state,
            escalated,
        }
    }
}

impl Default for ReactionPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default(), EscalationConfig::default())
    }
}
