//! Bounded exponential backoff.
//!
//! The delay schedule is a pure function of the retry number so it can be
//! checked without waiting; callers do the sleeping.

use std::time::Duration;

use locsync_core::RetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            initial_delay: Duration::from_millis(cfg.initial_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms.max(cfg.initial_delay_ms)),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `retry` (1-based). Retry 0 is the first call
    /// and never waits; each later retry doubles the previous delay, capped at
    /// `max_delay`.
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(retry - 1);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Retry numbers this policy allows, in order.
    pub fn retries(&self) -> impl Iterator<Item = u32> {
        1..=self.max_retries
    }
}
