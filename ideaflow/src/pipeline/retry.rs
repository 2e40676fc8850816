//! Reconnection policy with bounded attempts and capped backoff.
//!
//! The policy is a pure function of the attempt number: it never sleeps and
//! holds no counters. The connection lifecycle owns the counter and resets it
//! whenever an event is received.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base * 2^attempt
    #[default]
    Exponential,
    /// delay = base * (attempt + 1)
    Linear,
    /// delay = base (constant)
    Constant,
}

/// Jitter strategy to spread out reconnect storms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter
    #[default]
    None,
    /// Random from 0 to delay
    Full,
    /// Half fixed, half random
    Equal,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    10_000
}

/// Configuration for stream reconnection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Maximum reconnection attempts after consecutive drops.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first reconnection, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Backoff strategy.
    #[serde(default)]
    pub backoff_strategy: BackoffStrategy,
    /// Jitter strategy.
    #[serde(default)]
    pub jitter_strategy: JitterStrategy,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_strategy: BackoffStrategy::Exponential,
            jitter_strategy: JitterStrategy::None,
        }
    }
}

impl ReconnectConfig {
    /// Creates a new reconnect config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff_strategy = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter_strategy = strategy;
        self
    }
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Reconnect after the specified delay.
    Retry(Duration),
    /// No more attempts, give up.
    GiveUp,
}

impl RetryDecision {
    /// Returns true if another attempt should be made.
    #[must_use]
    pub fn should_retry(&self) -> bool {
        matches!(self, Self::Retry(_))
    }

    /// The delay before the next attempt, if any.
    #[must_use]
    pub fn delay(&self) -> Option<Duration> {
        match self {
            Self::Retry(delay) => Some(*delay),
            Self::GiveUp => None,
        }
    }
}

/// Decides whether and when to reconnect.
#[derive(Debug, Clone, Default)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
}

impl ReconnectPolicy {
    /// Creates a policy from its configuration.
    #[must_use]
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &ReconnectConfig {
        &self.config
    }

    /// Decides for the given zero-based attempt number.
    ///
    /// `attempt` counts reconnections already made since the last received
    /// event.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.config.max_attempts {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry(self.calculate_delay(attempt))
    }

    /// Calculates the delay for an attempt.
    #[must_use]
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base = self.config.base_delay_ms;
        let max = self.config.max_delay_ms;

        let delay = match self.config.backoff_strategy {
            BackoffStrategy::Exponential => base.saturating_mul(2u64.saturating_pow(attempt)).min(max),
            BackoffStrategy::Linear => base.saturating_mul(u64::from(attempt) + 1).min(max),
            BackoffStrategy::Constant => base.min(max),
        };

        let jittered = match self.config.jitter_strategy {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        };

        Duration::from_millis(jittered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_config_default() {
        let config = ReconnectConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.base_delay_ms, 1000);
        assert_eq!(config.max_delay_ms, 10_000);
        assert_eq!(config.backoff_strategy, BackoffStrategy::Exponential);
        assert_eq!(config.jitter_strategy, JitterStrategy::None);
    }

    #[test]
    fn test_reconnect_config_builder() {
        let config = ReconnectConfig::new()
            .with_max_attempts(2)
            .with_base_delay_ms(50)
            .with_max_delay_ms(400)
            .with_backoff(BackoffStrategy::Linear)
            .with_jitter(JitterStrategy::Equal);

        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.base_delay_ms, 50);
        assert_eq!(config.max_delay_ms, 400);
        assert_eq!(config.backoff_strategy, BackoffStrategy::Linear);
        assert_eq!(config.jitter_strategy, JitterStrategy::Equal);
    }

    #[test]
    fn test_default_schedule() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<Option<u128>> = (0..6)
            .map(|attempt| policy.should_retry(attempt).delay().map(|d| d.as_millis()))
            .collect();

        assert_eq!(
            delays,
            vec![Some(1000), Some(2000), Some(4000), Some(8000), Some(10_000), None]
        );
    }

    #[test]
    fn test_give_up_at_ceiling() {
        let policy = ReconnectPolicy::new(ReconnectConfig::new().with_max_attempts(2));
        assert!(policy.should_retry(0).should_retry());
        assert!(policy.should_retry(1).should_retry());
        assert_eq!(policy.should_retry(2), RetryDecision::GiveUp);
        assert_eq!(policy.should_retry(u32::MAX), RetryDecision::GiveUp);
    }

    #[test]
    fn test_delay_capped_for_huge_attempts() {
        let policy = ReconnectPolicy::new(ReconnectConfig::new().with_max_attempts(u32::MAX));
        assert_eq!(policy.calculate_delay(63), Duration::from_millis(10_000));
        assert_eq!(policy.calculate_delay(200), Duration::from_millis(10_000));
    }

    #[test]
    fn test_linear_and_constant_backoff() {
        let linear = ReconnectPolicy::new(
            ReconnectConfig::new()
                .with_base_delay_ms(100)
                .with_backoff(BackoffStrategy::Linear),
        );
        assert_eq!(linear.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(linear.calculate_delay(2), Duration::from_millis(300));

        let constant = ReconnectPolicy::new(
            ReconnectConfig::new()
                .with_base_delay_ms(100)
                .with_backoff(BackoffStrategy::Constant),
        );
        assert_eq!(constant.calculate_delay(4), Duration::from_millis(100));
    }

    #[test]
    fn test_full_jitter_bounded() {
        let policy = ReconnectPolicy::new(
            ReconnectConfig::new()
                .with_base_delay_ms(100)
                .with_backoff(BackoffStrategy::Constant)
                .with_jitter(JitterStrategy::Full),
        );

        for _ in 0..20 {
            assert!(policy.calculate_delay(0) <= Duration::from_millis(100));
        }
    }

    #[test]
    fn test_equal_jitter_keeps_half() {
        let policy = ReconnectPolicy::new(
            ReconnectConfig::new()
                .with_base_delay_ms(100)
                .with_backoff(BackoffStrategy::Constant)
                .with_jitter(JitterStrategy::Equal),
        );

        for _ in 0..20 {
            let delay = policy.calculate_delay(0);
            assert!(delay >= Duration::from_millis(50));
            assert!(delay <= Duration::from_millis(100));
        }
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: ReconnectConfig = serde_json::from_str(r#"{"max_attempts": 3}"#).unwrap();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.base_delay_ms, 1000);
        assert_eq!(config.jitter_strategy, JitterStrategy::None);
    }
}
