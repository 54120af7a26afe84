use std::time::Duration;

use common::{QueueAppConfig, RetryPolicy};

/// Consumer loop settings derived from [`QueueAppConfig`].
#[derive(Debug, Clone)]
pub struct ConsumeConfig {
    pub poll_interval: Duration,
    /// Maximum messages handled by one drain pass. `0` means unbounded.
    pub batch_size: usize,
    pub retry: RetryPolicy,
}

impl From<&QueueAppConfig> for ConsumeConfig {
    fn from(config: &QueueAppConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            batch_size: config.batch_size,
            retry: config.retry_policy(),
        }
    }
}

impl Default for ConsumeConfig {
    fn default() -> Self {
        Self::from(&QueueAppConfig::default())
    }
}
