use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    2
}

/// Inbound webhook authentication. When enabled, callers must present the
/// shared secret in the `X-Shared-Secret` header.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub shared_secret: String,
}

/// Queue transport selection. The relational transport rides on the shared
/// database; `address` overrides the connection for external transports.
#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    #[serde(default = "default_queue_transport")]
    pub transport: String,
    #[serde(default)]
    pub address: String,
}

fn default_queue_transport() -> String {
    "database".into()
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            transport: default_queue_transport(),
            address: String::new(),
        }
    }
}

/// Background re-enqueueing of leads stuck in RECEIVED (e.g. when the
/// enqueue failed after the lead row was persisted).
#[derive(Debug, Deserialize, Clone)]
pub struct SweeperConfig {
    #[serde(default = "default_sweeper_enabled")]
    pub enabled: bool,
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    /// How long a lead may sit in RECEIVED before it is considered orphaned.
    #[serde(default = "default_age_threshold_secs")]
    pub age_threshold_secs: u64,
}

fn default_sweeper_enabled() -> bool {
    true
}
fn default_scan_interval_secs() -> u64 {
    60
}
fn default_age_threshold_secs() -> u64 {
    600
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: default_sweeper_enabled(),
            scan_interval_secs: default_scan_interval_secs(),
            age_threshold_secs: default_age_threshold_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "json" or "pretty".
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "json".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub sweeper: SweeperConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., LEADGATE__AUTH__SHARED_SECRET)
            .add_source(Environment::with_prefix("LEADGATE").separator("__"))
            .build()?;

        let config: Self = s.try_deserialize()?;

        if config.auth.enabled && config.auth.shared_secret.is_empty() {
            return Err(ConfigError::Message(
                "auth.shared_secret is required when auth.enabled is true".into(),
            ));
        }

        Ok(config)
    }
}
