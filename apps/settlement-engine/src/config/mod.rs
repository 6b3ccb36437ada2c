//! Configuration module for the settlement engine.
//!
//! Loads a YAML file with `${VAR}` / `${VAR:-default}` environment
//! interpolation, then validates it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use settlement_engine::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! println!("HTTP port: {}", config.server.http_port);
//! ```

mod engine;
mod keeper;
mod observability;
mod router;
mod server;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use engine::EngineConfig;
pub use keeper::KeeperConfig;
pub use observability::ObservabilityConfig;
pub use router::RouterConfig;
pub use server::ServerConfig;

use crate::application::use_cases::MAX_SAFETY_MARGIN_BPS;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Engine identities and protocol parameters.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Liquidity router connection.
    #[serde(default)]
    pub router: RouterConfig,
    /// Expiry keeper.
    #[serde(default)]
    pub keeper: KeeperConfig,
    /// Logging.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;
    load_config_from_string(&contents)
}

/// Load configuration from a YAML string.
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax. Unset variables
/// without a default become empty.
#[allow(clippy::expect_used)] // Regex is compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match cap.get(1).map(|m| std::env::var(m.as_str())) {
            Some(Ok(value)) if !value.is_empty() => value,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let server = &config.server;
    if server.metrics_enabled && server.http_port == server.metrics_port {
        return Err(ConfigError::ValidationError(
            "server.http_port and server.metrics_port must be different".to_string(),
        ));
    }

    let engine = &config.engine;
    if engine.deployment_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "engine.deployment_id must not be empty".to_string(),
        ));
    }
    if engine.quote_asset.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "engine.quote_asset must not be empty".to_string(),
        ));
    }
    if engine.admin.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "engine.admin must be set".to_string(),
        ));
    }
    if engine.protocol_account.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "engine.protocol_account must not be empty".to_string(),
        ));
    }
    if engine.safety_margin_bps > MAX_SAFETY_MARGIN_BPS {
        return Err(ConfigError::ValidationError(format!(
            "engine.safety_margin_bps must be at most {MAX_SAFETY_MARGIN_BPS}"
        )));
    }
    if engine.liquidator_share_bps > 10_000 {
        return Err(ConfigError::ValidationError(
            "engine.liquidator_share_bps must be at most 10000".to_string(),
        ));
    }
    for (asset, bounds) in &engine.assets {
        if asset == &engine.quote_asset {
            return Err(ConfigError::ValidationError(format!(
                "engine.assets.{asset}: the quote asset cannot be an underlying"
            )));
        }
        if !bounds.min_amount.is_positive() || bounds.min_amount > bounds.max_amount {
            return Err(ConfigError::ValidationError(format!(
                "engine.assets.{asset}: min_amount must be positive and not above max_amount"
            )));
        }
    }

    let router = &config.router;
    if !(router.base_url.starts_with("http://") || router.base_url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(
            "router.base_url must be an http(s) URL".to_string(),
        ));
    }
    if router.timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "router.timeout_ms must be positive".to_string(),
        ));
    }
    if router.initial_backoff_ms > router.max_backoff_ms {
        return Err(ConfigError::ValidationError(
            "router.initial_backoff_ms must not exceed router.max_backoff_ms".to_string(),
        ));
    }

    let keeper = &config.keeper;
    if keeper.enabled {
        if keeper.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "keeper.interval_secs must be positive".to_string(),
            ));
        }
        if keeper.settlement_window_secs == 0 {
            return Err(ConfigError::ValidationError(
                "keeper.settlement_window_secs must be positive".to_string(),
            ));
        }
        if keeper.identity.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "keeper.identity must not be empty".to_string(),
            ));
        }
    }

    Ok(())
}
