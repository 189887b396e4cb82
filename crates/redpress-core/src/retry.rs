use std::time::Duration;

/// Bounded exponential backoff for transport failures.
///
/// An operation is attempted up to `max_attempts` times; the wait before
/// retry `n` is `initial_delay * 2^(n-1)`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_attempts: usize, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
        }
    }

    /// A policy which makes a single attempt.
    #[must_use]
    pub const fn never() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// The delay to wait after the `failures`-th consecutive failure.
    #[must_use]
    pub fn delay(&self, failures: usize) -> Duration {
        let exponent = u32::try_from(failures.saturating_sub(1)).unwrap_or(u32::MAX);
        let factor = 2_u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Whether another attempt is allowed after `failures` consecutive failures.
    #[must_use]
    pub const fn should_retry(&self, failures: usize) -> bool {
        failures < self.max_attempts
    }
}
