//! Retry policy for the broker processing loop.

use std::time::Duration;

/// Retry limits and backoff bounds.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base backoff duration in milliseconds
    pub base_backoff_ms: u64,
    /// Backoff cap in milliseconds
    pub max_backoff_ms: u64,
}

impl RetryConfig {
    pub fn new(max_retries: u32, base_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            base_backoff_ms,
            max_backoff_ms,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 1000,
            max_backoff_ms: 30000,
        }
    }
}

/// Exponential backoff strategy, capped at `max_backoff_ms`.
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    config: RetryConfig,
}

impl RetryStrategy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Whether another attempt is allowed after `attempt` failures.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.config.max_retries
    }

    /// Backoff duration before retry number `attempt` (1-based).
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(32);
        let backoff = self
            .config
            .base_backoff_ms
            .saturating_mul(1u64 << exp)
            .min(self.config.max_backoff_ms);
        Duration::from_millis(backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_retry_respects_limit() {
        let strategy = RetryStrategy::new(RetryConfig::new(3, 100, 1000));
        assert!(strategy.should_retry(0));
        assert!(strategy.should_retry(2));
        assert!(!strategy.should_retry(3));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let strategy = RetryStrategy::new(RetryConfig::new(10, 100, 1000));
        assert_eq!(strategy.calculate_backoff(1), Duration::from_millis(100));
        assert_eq!(strategy.calculate_backoff(2), Duration::from_millis(200));
        assert_eq!(strategy.calculate_backoff(3), Duration::from_millis(400));
        assert_eq!(strategy.calculate_backoff(8), Duration::from_millis(1000));
        assert_eq!(strategy.calculate_backoff(63), Duration::from_millis(1000));
    }
}
