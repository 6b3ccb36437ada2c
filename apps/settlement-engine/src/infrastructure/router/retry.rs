//! Retry policy with exponential backoff for idempotent router reads.
//!
//! | Retryable | Non-Retryable |
//! |-----------|---------------|
//! | HTTP 408, 429 | HTTP 400, 404, 422 |
//! | HTTP 500, 502, 503, 504 | Any error from `execute` |
//! | Connection and timeout errors | Malformed responses |

use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Retry policy for router reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt (default: 3).
    pub max_retries: u32,
    /// First backoff (default: 100ms).
    pub initial_backoff: Duration,
    /// Backoff cap (default: 2s).
    pub max_backoff: Duration,
    /// Growth factor per retry (default: 2.0).
    pub multiplier: f64,
    /// ±fraction of randomization (default: 0.2).
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }
}

/// Backoff sequence for one request.
#[derive(Debug)]
pub(crate) struct Backoff {
    attempt: u32,
    max_retries: u32,
    initial_ms: f64,
    max_ms: f64,
    multiplier: f64,
    jitter_factor: f64,
}

impl Backoff {
    pub(crate) fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            max_retries: policy.max_retries,
            initial_ms: policy.initial_backoff.as_millis() as f64,
            max_ms: policy.max_backoff.as_millis() as f64,
            multiplier: policy.multiplier,
            jitter_factor: policy.jitter_factor,
        }
    }

    /// Retries used so far.
    pub(crate) const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next retry, or `None` once retries are exhausted.
    pub(crate) fn next_backoff(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_retries {
            return None;
        }
        let base = (self.initial_ms * self.multiplier.powi(self.attempt as i32)).min(self.max_ms);
        self.attempt += 1;

        let spread = base * self.jitter_factor;
        let jittered = if spread > 0.0 {
            rand::rng().random_range((base - spread).max(0.0)..=base + spread)
        } else {
            base
        };
        Some(Duration::from_millis(jittered.min(self.max_ms).round() as u64))
    }
}

/// Whether a response status is worth retrying on an idempotent read.
pub(crate) const fn is_retryable(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_retries: 4,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(300),
            multiplier: 2.0,
            jitter_factor: 0.0,
        };
        let mut backoff = Backoff::new(&policy);

        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(300)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(300)));
        assert_eq!(backoff.next_backoff(), None);
        assert_eq!(backoff.attempt(), 4);
    }

    #[test]
    fn jitter_stays_in_range() {
        let policy = RetryPolicy {
            max_retries: 50,
            ..RetryPolicy::default()
        };
        let mut backoff = Backoff::new(&policy);
        let first = backoff.next_backoff().unwrap();
        assert!(first >= Duration::from_millis(80) && first <= Duration::from_millis(120));
        while let Some(delay) = backoff.next_backoff() {
            assert!(delay <= policy.max_backoff);
        }
    }

    #[test]
    fn no_retry_policy() {
        assert_eq!(Backoff::new(&RetryPolicy::none()).next_backoff(), None);
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
    }
}
