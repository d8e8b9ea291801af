//! Exponential backoff policy for the resilient call wrapper.
//!
//! [`BackoffConfig`] bounds how many times one logical generation request is
//! attempted and how long to wait between attempts after a transient
//! failure (rate limit, connection failure, server error).

use std::time::Duration;

/// Retry bound and delay schedule for generation calls.
///
/// # Example
///
/// ```
/// use consultant_pipeline::backend::BackoffConfig;
/// use std::time::Duration;
///
/// let standard = BackoffConfig::standard();
/// assert_eq!(standard.max_attempts, 3);
/// assert_eq!(standard.delay_for_attempt(1), Duration::from_secs(2));
///
/// // Single attempt, no retry.
/// assert_eq!(BackoffConfig::none().max_attempts, 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Maximum number of attempts, counting the first one. Default: 3.
    pub max_attempts: u32,

    /// Delay after the first failed attempt. Default: 1 second.
    pub initial_delay: Duration,

    /// Growth factor per attempt. Default: 2.0.
    pub multiplier: f64,

    /// Upper bound on any single delay. Default: 60 seconds.
    pub max_delay: Duration,

    /// Jitter applied on top of the capped delay. Default: none.
    pub jitter: JitterStrategy,

    /// Honour a `Retry-After` hint on rate-limit responses. Default: `false`.
    pub respect_retry_after: bool,
}

/// Jitter strategy for spreading retries from concurrent callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JitterStrategy {
    /// Delay is exactly the calculated value.
    #[default]
    None,

    /// Random value in `[0, calculated_delay]`.
    Full,

    /// `calculated_delay/2 + random in [0, calculated_delay/2]`.
    Equal,
}

impl BackoffConfig {
    /// 3 attempts, 1s initial, 2x multiplier, 60s cap, no jitter.
    pub fn standard() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            jitter: JitterStrategy::None,
            respect_retry_after: false,
        }
    }

    /// A single attempt; transient failures are reported immediately.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::standard()
        }
    }

    /// Retry without waiting. Handy for tests and local mocks.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::standard()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay after failed attempt N (0-indexed).
    ///
    /// The base delay is `initial_delay * multiplier^attempt`, capped at
    /// `max_delay`. Jitter is then applied according to the configured strategy.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        let jittered = match self.jitter {
            JitterStrategy::None => capped,
            JitterStrategy::Full => fastrand::f64() * capped,
            JitterStrategy::Equal => capped / 2.0 + fastrand::f64() * (capped / 2.0),
        };

        Duration::from_secs_f64(jittered)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay_exponential() {
        let config = BackoffConfig::standard();

        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_delay_capped_at_max() {
        let config = BackoffConfig::standard().with_max_delay(Duration::from_secs(5));

        // Attempt 3 would be 8s uncapped
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(5));
        // Attempt 10 would be 1024s uncapped
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(5));
    }

    #[test]
    fn test_default_cap_is_sixty_seconds() {
        let config = BackoffConfig::standard();
        assert_eq!(config.delay_for_attempt(20), Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_jitter_full_in_range() {
        let config = BackoffConfig::standard().with_jitter(JitterStrategy::Full);

        for _ in 0..100 {
            let d = config.delay_for_attempt(0);
            assert!(d <= Duration::from_secs(1), "delay {:?} > 1s", d);
        }
        for _ in 0..100 {
            let d = config.delay_for_attempt(1);
            assert!(d <= Duration::from_secs(2), "delay {:?} > 2s", d);
        }
    }

    #[test]
    fn test_backoff_jitter_equal_lower_bound() {
        let config = BackoffConfig::standard().with_jitter(JitterStrategy::Equal);
        for _ in 0..100 {
            let d = config.delay_for_attempt(1);
            assert!(d >= Duration::from_secs(1) && d <= Duration::from_secs(2));
        }
    }

    #[test]
    fn test_presets() {
        assert_eq!(BackoffConfig::none().max_attempts, 1);
        assert_eq!(BackoffConfig::default(), BackoffConfig::standard());
        let immediate = BackoffConfig::immediate(4);
        assert_eq!(immediate.max_attempts, 4);
        assert_eq!(immediate.delay_for_attempt(3), Duration::ZERO);
    }

    #[test]
    fn test_max_attempts_floor() {
        assert_eq!(BackoffConfig::standard().with_max_attempts(0).max_attempts, 1);
    }
}
