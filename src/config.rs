use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_APP_ORIGIN: &str = "http://localhost:8081";
const DEFAULT_CURRENCY: &str = "RWF";
const DEFAULT_DELIVERY_FEE: i64 = 1000;
const DEFAULT_REDIRECT_PATH: &str = "/payment/status";
const DEFAULT_STATUS_CHECK_WAIT_MS: u64 = 5000;
pub const CONFIG_DIR: &str = "config";

/// Checkout core configuration
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CheckoutConfig {
    /// Base URL of the storefront API. When unset, endpoints resolve against `app_origin`.
    #[serde(default)]
    #[validate(custom = "validate_http_url")]
    pub api_base_url: Option<String>,

    /// Origin of the app itself
    #[serde(default = "default_app_origin")]
    #[validate(custom = "validate_http_url")]
    pub app_origin: String,

    /// ISO currency code used for payments and orders
    #[serde(default = "default_currency")]
    #[validate(custom = "validate_currency")]
    pub currency: String,

    /// Flat delivery fee added to every order (whole currency units)
    #[serde(default = "default_delivery_fee")]
    #[validate(range(min = 0))]
    pub delivery_fee: i64,

    /// Path the gateway redirects to after a hosted checkout
    #[serde(default = "default_redirect_path")]
    pub payment_redirect_path: String,

    /// Upper bound a status check waits for another in-flight check
    #[serde(default = "default_status_check_wait_ms")]
    pub status_check_wait_ms: u64,

    /// Optional per-request timeout; none means the transport default
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            app_origin: default_app_origin(),
            currency: default_currency(),
            delivery_fee: default_delivery_fee(),
            payment_redirect_path: default_redirect_path(),
            status_check_wait_ms: default_status_check_wait_ms(),
            request_timeout_secs: None,
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl CheckoutConfig {
    /// Configuration pointing at an explicit API base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    /// The base every endpoint is resolved against.
    pub fn effective_base(&self) -> &str {
        self.api_base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(self.app_origin.as_str())
            .trim_end_matches('/')
    }

    /// Joins an absolute API path (e.g. `/api/payments/kpay/status`) with the base.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.effective_base(), path.trim_start_matches('/'))
    }

    /// URL the gateway sends the customer back to.
    pub fn redirect_url(&self) -> String {
        format!(
            "{}/{}",
            self.app_origin.trim_end_matches('/'),
            self.payment_redirect_path.trim_start_matches('/')
        )
    }

    pub fn status_check_wait(&self) -> Duration {
        Duration::from_millis(self.status_check_wait_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_app_origin() -> String {
    DEFAULT_APP_ORIGIN.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_delivery_fee() -> i64 {
    DEFAULT_DELIVERY_FEE
}

fn default_redirect_path() -> String {
    DEFAULT_REDIRECT_PATH.to_string()
}

fn default_status_check_wait_ms() -> u64 {
    DEFAULT_STATUS_CHECK_WAIT_MS
}

fn validate_http_url(url: &str) -> Result<(), ValidationError> {
    let trimmed = url.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(())
    } else {
        let mut err = ValidationError::new("url");
        err.message = Some("URL must start with http:// or https://".into());
        Err(err)
    }
}

fn validate_currency(currency: &str) -> Result<(), ValidationError> {
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("currency");
        err.message = Some("Currency must be a 3-letter ISO code".into());
        Err(err)
    }
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("storefront_checkout={}", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads configuration from the default `config/` directory.
pub fn load_config() -> Result<CheckoutConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Loads configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. `{dir}/default.toml`
/// 3. `{dir}/{env}.toml`
/// 4. Environment variables (APP__*)
pub fn load_config_from(dir: &Path) -> Result<CheckoutConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading checkout configuration for environment: {}", run_env);

    if !dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            dir.display()
        );
    }

    let config = Config::builder()
        .set_default("app_origin", DEFAULT_APP_ORIGIN)?
        .set_default("currency", DEFAULT_CURRENCY)?
        .set_default("delivery_fee", DEFAULT_DELIVERY_FEE)?
        .set_default("payment_redirect_path", DEFAULT_REDIRECT_PATH)?
        .set_default("status_check_wait_ms", DEFAULT_STATUS_CHECK_WAIT_MS)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(dir.join("default")).required(false))
        .add_source(File::from(dir.join(&run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let checkout_config: CheckoutConfig = config.try_deserialize()?;

    checkout_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!(
        base = %checkout_config.effective_base(),
        currency = %checkout_config.currency,
        "Checkout configuration loaded"
    );
    Ok(checkout_config)
}
