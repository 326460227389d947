//! Exponential backoff with jitter
//!
//! `delay(n) = min(initial * 2^n, max) + U(0, jitter)`

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ChangelistError;

/// Exponent cap, keeps `2^attempt` from overflowing.
const MAX_EXPONENT: u32 = 20;

/// Retry budget and backoff shape for operations that retry on their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Additional attempts after the first one (0 disables retrying).
    pub max_retries: u32,
    #[serde(rename = "initialDelayMs", with = "crate::utils::duration_ms")]
    pub initial_delay: Duration,
    #[serde(rename = "maxDelayMs", with = "crate::utils::duration_ms")]
    pub max_delay: Duration,
    /// Upper bound of the random jitter added to every computed delay.
    #[serde(rename = "jitterMs", with = "crate::utils::duration_ms")]
    pub jitter: Duration,
    /// Upper bound applied to server `retry-after` hints.
    #[serde(rename = "maxRetryAfterMs", with = "crate::utils::duration_ms")]
    pub max_retry_after: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: Duration::from_secs(1),
            max_retry_after: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Disable retries entirely.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Backoff delay for a failed attempt (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        delay(attempt, self.initial_delay, self.max_delay, self.jitter)
    }

    /// Wait before retrying after `error`.
    ///
    /// A server `retry-after` hint wins over the computed backoff, capped at
    /// [`max_retry_after`](Self::max_retry_after).
    pub fn retry_delay(&self, error: &ChangelistError, attempt: u32) -> Duration {
        match error.retry_after() {
            Some(secs) => Duration::from_secs(secs).min(self.max_retry_after),
            None => self.backoff(attempt),
        }
    }
}

/// `min(initial * 2^attempt, max)` without jitter.
pub fn base_delay(attempt: u32, initial: Duration, max: Duration) -> Duration {
    let factor = 1_u32 << attempt.min(MAX_EXPONENT);
    initial.saturating_mul(factor).min(max)
}

/// Backoff delay for `attempt` plus uniform jitter in `[0, jitter]`.
pub fn delay(attempt: u32, initial: Duration, max: Duration, jitter: Duration) -> Duration {
    base_delay(attempt, initial, max) + random_jitter(jitter)
}

/// Uniform random duration in `[0, bound]`, millisecond resolution.
pub fn random_jitter(bound: Duration) -> Duration {
    let bound_ms = u64::try_from(bound.as_millis()).unwrap_or(u64::MAX);
    if bound_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=bound_ms))
}
