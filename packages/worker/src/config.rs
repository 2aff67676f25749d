use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

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

#[derive(Debug, Deserialize, Clone)]
pub struct CustomerApiConfig {
    /// Endpoint leads are POSTed to.
    pub url: String,
    /// Bearer token for the downstream customer API.
    pub token: String,
    /// Hard cap on a single delivery attempt.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Product identifier injected into every customer payload.
    pub product_name: String,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerSettings {
    /// Queue poll wait between dequeue attempts.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Number of concurrent poll loops.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_poll_interval_ms() -> u64 {
    5000
}
fn default_concurrency() -> usize {
    5
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Maximum delivery attempts per lead. Default: 5.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base of the exponential backoff schedule. Default: 30s.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
}

fn default_max_attempts() -> u32 {
    5
}
fn default_backoff_base_secs() -> u64 {
    30
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_secs: default_backoff_base_secs(),
        }
    }
}

/// Rejection codes written to `lead.rejection_reason`.
#[derive(Debug, Deserialize, Clone)]
pub struct RejectionCodes {
    #[serde(default = "default_code_zipcode")]
    pub zipcode_invalid: String,
    #[serde(default = "default_code_homeowner")]
    pub not_homeowner: String,
    #[serde(default = "default_code_missing_field")]
    pub missing_required_field: String,
}

fn default_code_zipcode() -> String {
    "ZIPCODE_INVALID".into()
}
fn default_code_homeowner() -> String {
    "NOT_HOMEOWNER".into()
}
fn default_code_missing_field() -> String {
    "MISSING_REQUIRED_FIELD".into()
}

impl Default for RejectionCodes {
    fn default() -> Self {
        Self {
            zipcode_invalid: default_code_zipcode(),
            not_homeowner: default_code_homeowner(),
            missing_required_field: default_code_missing_field(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ValidationConfig {
    /// Anchored pattern the postal code must match.
    #[serde(default = "default_zipcode_pattern")]
    pub zipcode_pattern: String,
    /// Scalar fields that must be present in the raw payload.
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub codes: RejectionCodes,
}

fn default_zipcode_pattern() -> String {
    r"^66\d{3}$".into()
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            zipcode_pattern: default_zipcode_pattern(),
            required_fields: Vec::new(),
            codes: RejectionCodes::default(),
        }
    }
}

/// Field names carrying the email / phone semantic roles during
/// normalization.
#[derive(Debug, Deserialize, Clone)]
pub struct NormalizationConfig {
    #[serde(default = "default_email_fields")]
    pub email_fields: Vec<String>,
    #[serde(default = "default_phone_fields")]
    pub phone_fields: Vec<String>,
}

fn default_email_fields() -> Vec<String> {
    vec!["email".into()]
}
fn default_phone_fields() -> Vec<String> {
    vec!["phone".into(), "phone_number".into(), "telephone".into()]
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            email_fields: default_email_fields(),
            phone_fields: default_phone_fields(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AttributesConfig {
    /// Path to the attribute-validation JSON document.
    #[serde(default = "default_attributes_path")]
    pub path: String,
}

fn default_attributes_path() -> String {
    "./config/customer_attributes.json".into()
}

impl Default for AttributesConfig {
    fn default() -> Self {
        Self {
            path: default_attributes_path(),
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
pub struct WorkerAppConfig {
    pub database: DatabaseConfig,
    pub customer_api: CustomerApiConfig,
    #[serde(default)]
    pub worker: WorkerSettings,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub normalization: NormalizationConfig,
    #[serde(default)]
    pub attributes: AttributesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WorkerAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., LEADGATE__CUSTOMER_API__TOKEN)
            .add_source(Environment::with_prefix("LEADGATE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
