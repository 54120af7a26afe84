use common::{QueueAppConfig, StorageConfig};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Namespace of sticky filter session slots. Default: "backend".
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Name of the session cookie. Default: "ema_session".
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
}

fn default_app_name() -> String {
    "backend".into()
}
fn default_session_cookie() -> String {
    "ema_session".into()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpdateConfig {
    /// Directory holding `<version>.sql` files. Default: "./install-sql".
    #[serde(default = "default_sql_dir")]
    pub sql_dir: String,
    /// Directory holding `<version>.json` translation deltas. Default: "./translations".
    #[serde(default = "default_translations_dir")]
    pub translations_dir: String,
    /// Run pending updates when the server starts. Default: false.
    #[serde(default)]
    pub auto_run: bool,
}

fn default_sql_dir() -> String {
    "./install-sql".into()
}
fn default_translations_dir() -> String {
    "./translations".into()
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            sql_dir: default_sql_dir(),
            translations_dir: default_translations_dir(),
            auto_run: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub queue: QueueAppConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub update: UpdateConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("EMA_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "sqlite://ema.db?mode=rwc")?
            // Load from config/config.toml
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., EMA__DATABASE__URL)
            .add_source(Environment::with_prefix("EMA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
