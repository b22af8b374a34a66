//! Configuration for the sync engine.

use crate::error::{SyncError, SyncResult};
use std::time::Duration;
use syncward_protocol::{DataTypeSet, DEFAULT_EVENT_HISTORY};

/// Configuration for a sync session.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Retry configuration for transient errors.
    pub retry: RetryConfig,
    /// When repeated transient errors are escalated.
    pub escalation: EscalationConfig,
    /// Data types enabled when the session starts.
    pub initial_types: DataTypeSet,
    /// Number of protocol events kept for diagnostics.
    pub event_history: usize,
}

impl EngineConfig {
    /// Creates a configuration with defaults and every data type enabled.
    pub fn new() -> Self {
        Self {
            retry: RetryConfig::default(),
            escalation: EscalationConfig::default(),
            initial_types: DataTypeSet::all(),
            event_history: DEFAULT_EVENT_HISTORY,
        }
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the escalation configuration.
    pub fn with_escalation(mut self, escalation: EscalationConfig) -> Self {
        self.escalation = escalation;
        self
    }

    /// Sets the data types enabled at session start.
    pub fn with_initial_types(mut self, types: DataTypeSet) -> Self {
        self.initial_types = types;
        self
    }

    /// Sets the number of retained protocol events.
    pub fn with_event_history(mut self, events: usize) -> Self {
        self.event_history = events;
        self
    }

    /// Checks that the configuration can drive an engine.
    pub fn validate(&self) -> SyncResult<()> {
        if self.escalation.threshold == 0 {
            return Err(SyncError::InvalidConfig(
                "escalation threshold must be at least 1".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(SyncError::InvalidConfig(
                "retry max_attempts must be at least 1".into(),
            ));
        }
        let multiplier = self.retry.backoff_multiplier;
        if multiplier.is_nan() || multiplier < 1.0 {
            return Err(SyncError::InvalidConfig(format!(
                "backoff multiplier must be >= 1.0, got {multiplier}"
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts per retry run.
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    /// Calculates the delay for a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);

        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // Up to 25% jitter
            let jitter = delay_secs * 0.25 * rand_jitter();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(5)
    }
}

/// Pseudo-random jitter in `[0, 1)` derived from the clock.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

/// Bounds retry storms caused by repeated transient errors.
///
/// When `threshold` consecutive transient errors arrive and the first of
/// them is no older than `window` (measured on the transport's timestamps),
/// the policy stops retrying and disables sync on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationConfig {
    /// Consecutive transient errors that trigger escalation.
    pub threshold: u32,
    /// Time window the streak must fit in.
    pub window: Duration,
}

impl EscalationConfig {
    /// Creates a new escalation configuration.
    pub fn new(threshold: u32, window: Duration) -> Self {
        Self { threshold, window }
    }
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(10 * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncward_protocol::DataType;

    #[test]
    fn engine_config_builder() {
        let types: DataTypeSet = [DataType::Bookmarks].into_iter().collect();
        let config = EngineConfig::new()
            .with_escalation(EscalationConfig::new(3, Duration::from_secs(60)))
            .with_initial_types(types.clone())
            .with_event_history(16);

        assert_eq!(config.escalation.threshold, 3);
        assert_eq!(config.escalation.window, Duration::from_secs(60));
        assert_eq!(config.initial_types, types);
        assert_eq!(config.event_history, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_threshold() {
        let config = EngineConfig::new().with_escalation(EscalationConfig::new(0, Duration::ZERO));
        assert!(matches!(
            config.validate(),
            Err(SyncError::InvalidConfig(_))
        ));
    }

    #[test]
    fn validate_rejects_shrinking_backoff() {
        let config =
            EngineConfig::new().with_retry(RetryConfig::new(3).with_backoff_multiplier(0.5));
        assert!(config.validate().is_err());

        let config = EngineConfig::new().with_retry(RetryConfig::new(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn retry_config_no_retry() {
        let config = RetryConfig::no_retry();
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.delay_for_attempt(3), Duration::ZERO);
    }

    #[test]
    fn retry_delay_calculation() {
        let config = RetryConfig::new(5)
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0);

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);

        // Jitter makes exact values unpredictable, but bounds hold
        let delay1 = config.delay_for_attempt(1);
        assert!(delay1 >= Duration::from_millis(100));
        assert!(delay1 <= Duration::from_millis(150));

        let delay2 = config.delay_for_attempt(2);
        assert!(delay2 >= Duration::from_millis(200));
    }

    #[test]
    fn retry_delay_without_jitter_is_exact() {
        let config = RetryConfig::new(5)
            .with_initial_delay(Duration::from_millis(250))
            .with_jitter(false);

        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(1));
    }

    #[test]
    fn retry_delay_respects_max() {
        let config = RetryConfig::new(10)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_backoff_multiplier(10.0);

        let delay = config.delay_for_attempt(5);
        assert!(delay <= Duration::from_millis(6250)); // 5s + 25% jitter
    }
}
