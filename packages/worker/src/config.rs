use common::{QueueAppConfig, StorageConfig};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use server::config::DatabaseConfig;

/// Worker-specific configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Identifier of this worker instance, used in logs. Default: "worker-1".
    #[serde(default = "default_worker_id")]
    pub id: String,
    /// Seconds between scheduled count-history jobs in `run` mode. Default: 60.
    #[serde(default = "default_schedule_interval_secs")]
    pub schedule_interval_secs: u64,
}

fn default_worker_id() -> String {
    "worker-1".into()
}
fn default_schedule_interval_secs() -> u64 {
    60
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            id: default_worker_id(),
            schedule_interval_secs: default_schedule_interval_secs(),
        }
    }
}

/// Worker application configuration. Shares the database, queue and storage
/// sections with the server's config file.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerAppConfig {
    #[serde(default)]
    pub worker: WorkerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub queue: QueueAppConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl WorkerAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("EMA_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("worker.id", "worker-1")?
            .set_default("worker.schedule_interval_secs", 60_i64)?
            .set_default("database.url", "sqlite://ema.db?mode=rwc")?
            .add_source(File::with_name(&config_path).required(false))
            .add_source(Environment::with_prefix("EMA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
