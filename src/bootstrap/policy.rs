//! Retry budget and backoff schedule

use std::time::Duration;

/// How many times the model load is attempted and how long to wait between
/// attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Wait before the second attempt; doubles for each later attempt
    pub backoff_base: Duration,
    /// Upper bound on a single attempt (`None` = wait forever)
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            attempt_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl RetryPolicy {
    /// Wait inserted before `attempt` (1-based): nothing before the first,
    /// then `base * 2^(attempt - 2)`
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 2).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }

    /// Every wait a run that exhausts the budget goes through, in order
    pub fn schedule(&self) -> Vec<Duration> {
        (2..=self.max_attempts)
            .map(|attempt| self.backoff_before(attempt))
            .collect()
    }
}
