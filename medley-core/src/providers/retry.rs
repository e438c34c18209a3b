//! Retry policy with exponential backoff for provider calls

use super::error::RelayError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for retry behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the initial one
    pub max_retries: u32,

    /// Delay before the first retry (milliseconds); doubles per attempt
    pub base_delay_ms: u64,

    /// Ceiling on any single delay (milliseconds)
    pub max_delay_ms: u64,

    /// Jitter factor (0.0 to 1.0) to randomize delays
    pub jitter_factor: f64,

    /// Whether to honor upstream retry-after hints
    pub respect_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            jitter_factor: 0.1,
            respect_retry_after: true,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with a custom retry budget
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Create a policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculate the delay before retry number `attempt` (0-based)
    pub fn calculate_delay(&self, attempt: u32, error: &RelayError) -> Duration {
        if self.respect_retry_after {
            if let Some(hint) = error.retry_delay() {
                return hint;
            }
        }

        let base = self.base_delay_ms as f64 * 2f64.powi(attempt as i32);
        let capped = base.min(self.max_delay_ms as f64);

        let with_jitter = if self.jitter_factor > 0.0 {
            let jitter_range = capped * self.jitter_factor;
            let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
            (capped + jitter).max(0.0)
        } else {
            capped
        };

        Duration::from_millis(with_jitter as u64)
    }

    /// Whether to retry after `attempts_made` attempts failed with `error`
    pub fn should_retry(&self, error: &RelayError, attempts_made: u32) -> bool {
        attempts_made <= self.max_retries && error.is_retryable()
    }
}
