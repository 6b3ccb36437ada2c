//! Liquidity router and price oracle connection settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::infrastructure::router::{HttpRouterConfig, RetryPolicy};

/// Router configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Base URL of the router service.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retries for price and quote reads. Executions are never retried.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First retry delay in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Retry delay cap in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RouterConfig {
    /// Client settings for [`HttpLiquidityRouter`](crate::infrastructure::router::HttpLiquidityRouter).
    #[must_use]
    pub fn http_config(&self) -> HttpRouterConfig {
        HttpRouterConfig::new(self.base_url.as_str())
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_retry(RetryPolicy {
                max_retries: self.max_retries,
                initial_backoff: Duration::from_millis(self.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.max_backoff_ms),
                ..RetryPolicy::default()
            })
    }
}

fn default_base_url() -> String {
    "http://localhost:8545".to_string()
}

const fn default_timeout_ms() -> u64 {
    10_000
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    100
}

const fn default_max_backoff_ms() -> u64 {
    2_000
}
