use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::QueueAppConfig;

/// How many failed attempts a queue message gets and how long to wait
/// between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

/// Result of recording a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { attempt: u32, delay: Duration },
    Exhausted { attempts: u32 },
}

impl RetryPolicy {
    /// Decide what happens after the `attempts`-th failure (1-based).
    pub fn decide(&self, attempts: u32) -> RetryDecision {
        if attempts <= self.max_retries {
            RetryDecision::Retry {
                attempt: attempts,
                delay: calculate_backoff(attempts, self.base_delay_ms, self.max_delay_ms),
            }
        } else {
            RetryDecision::Exhausted { attempts }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        QueueAppConfig::default().retry_policy()
    }
}

impl QueueAppConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
        }
    }
}

/// Calculate exponential backoff delay with jitter.
///
/// Formula: `min(base_ms * 2^(attempt-1) + jitter, max_ms)` (0-25% jitter)
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exp_factor = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exp_factor);

    let jitter = if delay_ms > 0 {
        rand::rng().random_range(0..=delay_ms / 4)
    } else {
        0
    };

    Duration::from_millis(delay_ms.saturating_add(jitter).min(max_ms))
}
