//! Engine configuration.

use crate::provenance::RequiredProvenance;
use std::time::Duration;

/// What happens to the host write when history capture fails at the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapturePolicy {
    /// Surface store failures to the caller; the host write is treated as
    /// failed. This is the default: history is part of the write.
    #[default]
    Mandatory,
    /// Log store failures and let the host write proceed without a record.
    BestEffort,
}

/// Configuration for a [`crate::HistoryEngine`].
#[derive(Debug, Clone, Default)]
pub struct HistoryConfig {
    /// Dotted field paths stripped from captured deltas.
    pub omit: Vec<String>,
    /// When set, only these top-level fields are captured.
    pub pick: Option<Vec<String>>,
    /// Provenance fields a change must carry to be accepted.
    pub required: RequiredProvenance,
    /// Fields whose old/new values are spelled out in history summaries.
    pub expandable: Vec<String>,
    /// Whether the host write survives a failed capture.
    pub policy: CapturePolicy,
    /// Retry behavior for version conflicts and transient store failures.
    pub retry: RetryConfig,
}

impl HistoryConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the omitted field paths.
    #[must_use]
    pub fn with_omit(mut self, omit: Vec<String>) -> Self {
        self.omit = omit;
        self
    }

    /// Restricts capture to the given top-level fields.
    #[must_use]
    pub fn with_pick(mut self, pick: Vec<String>) -> Self {
        self.pick = Some(pick);
        self
    }

    /// Sets the mandatory provenance fields.
    #[must_use]
    pub const fn with_required(mut self, required: RequiredProvenance) -> Self {
        self.required = required;
        self
    }

    /// Sets the fields expanded in history summaries.
    #[must_use]
    pub fn with_expandable(mut self, expandable: Vec<String>) -> Self {
        self.expandable = expandable;
        self
    }

    /// Sets the capture policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: CapturePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Initial delay between attempts.
    pub initial_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Creates a retry configuration with the given attempt budget.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }

    /// Creates a configuration with no retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Sets the initial delay.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Calculates the delay before a given attempt (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let base = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        Duration::from_secs_f64(base.min(self.max_delay.as_secs_f64()))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_mandatory() {
        let config = HistoryConfig::default();
        assert_eq!(config.policy, CapturePolicy::Mandatory);
        assert!(config.omit.is_empty());
        assert!(config.pick.is_none());
    }

    #[test]
    fn builder_chain() {
        let config = HistoryConfig::new()
            .with_omit(vec!["secret".into()])
            .with_pick(vec!["name".into()])
            .with_required(RequiredProvenance::both())
            .with_policy(CapturePolicy::BestEffort);

        assert_eq!(config.omit, vec!["secret".to_string()]);
        assert_eq!(config.pick, Some(vec!["name".to_string()]));
        assert!(config.required.actor && config.required.reason);
        assert_eq!(config.policy, CapturePolicy::BestEffort);
    }

    #[test]
    fn backoff_grows_and_caps() {
        let retry = RetryConfig::new(5)
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(250));

        assert_eq!(retry.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(retry.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(retry.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(retry.delay_for_attempt(3), Duration::from_millis(250));
    }

    #[test]
    fn no_retry_is_single_attempt() {
        assert_eq!(RetryConfig::no_retry().max_attempts, 1);
    }
}
