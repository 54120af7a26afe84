use serde::Deserialize;

/// Queue transport and consumer configuration shared by the server (publisher)
/// and the worker (consumer).
#[derive(Debug, Deserialize, Clone)]
pub struct QueueAppConfig {
    /// Delay between polls when the queue is empty. Default: 1000.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Visibility lease of a claimed message. A message whose lease expires
    /// before it is acknowledged is delivered again with the redelivery flag.
    /// Default: 300.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,
    /// Failed attempts allowed before a message is dead-lettered. Default: 3.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential backoff between attempts. Default: 1000.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound for the backoff delay. Default: 60000.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Maximum messages handled by one `drain` pass. `0` means unbounded. Default: 0.
    #[serde(default)]
    pub batch_size: usize,
}

fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_lease_secs() -> u64 {
    300
}
fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    60_000
}

impl Default for QueueAppConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            lease_secs: default_lease_secs(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            batch_size: 0,
        }
    }
}

/// Queue storage (large export blobs kept outside message payloads).
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory of the queue storage. Default: "./storage/queue".
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// Maximum size of a single stored file in bytes. Default: 1 GiB.
    #[serde(default = "default_storage_max_size")]
    pub max_size: u64,
}

fn default_storage_path() -> String {
    "./storage/queue".into()
}
fn default_storage_max_size() -> u64 {
    1024 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            max_size: default_storage_max_size(),
        }
    }
}
