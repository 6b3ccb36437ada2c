//! Expiry keeper configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::services::ExpiryKeeperConfig;
use crate::domain::shared::Identity;

/// Expiry keeper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// Run the keeper.
    #[serde(default)]
    pub enabled: bool,
    /// Seconds between sweeps.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Identity liquidations are submitted as.
    #[serde(default = "default_identity")]
    pub identity: String,
    /// Router deadline per forced settlement, in seconds.
    #[serde(default = "default_settlement_window_secs")]
    pub settlement_window_secs: u64,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval_secs(),
            identity: default_identity(),
            settlement_window_secs: default_settlement_window_secs(),
        }
    }
}

impl KeeperConfig {
    /// Settings for the [`ExpiryKeeper`](crate::application::services::ExpiryKeeper).
    #[must_use]
    pub fn keeper_config(&self) -> ExpiryKeeperConfig {
        ExpiryKeeperConfig {
            interval: Duration::from_secs(self.interval_secs),
            identity: Identity::new(self.identity.as_str()),
            settlement_window: Duration::from_secs(self.settlement_window_secs),
        }
    }
}

const fn default_interval_secs() -> u64 {
    60
}

fn default_identity() -> String {
    "keeper".to_string()
}

const fn default_settlement_window_secs() -> u64 {
    30
}
