//! Engine configuration: identities, quote currency and protocol parameters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::application::use_cases::{LifecycleConfig, ProtocolParameters};
use crate::domain::commitment::AmountBounds;
use crate::domain::shared::{AssetId, BasisPoints, Identity};

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deployment tag bound into every commitment signature.
    #[serde(default = "default_deployment_id")]
    pub deployment_id: String,
    /// Quote currency for premiums, strikes and settlements.
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,
    /// Admin identity.
    #[serde(default)]
    pub admin: String,
    /// Account credited with protocol revenue.
    #[serde(default = "default_protocol_account")]
    pub protocol_account: String,
    /// Safety margin retained on settlements, in bps.
    #[serde(default = "default_safety_margin_bps")]
    pub safety_margin_bps: u32,
    /// Liquidator's share of the margin on forced expiries, in bps.
    #[serde(default = "default_liquidator_share_bps")]
    pub liquidator_share_bps: u32,
    /// Per-asset amount bands. Assets not listed cannot be taken.
    #[serde(default)]
    pub assets: HashMap<String, AmountBounds>,
    /// Start with takes paused.
    #[serde(default)]
    pub start_paused: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deployment_id: default_deployment_id(),
            quote_asset: default_quote_asset(),
            admin: String::new(),
            protocol_account: default_protocol_account(),
            safety_margin_bps: default_safety_margin_bps(),
            liquidator_share_bps: default_liquidator_share_bps(),
            assets: HashMap::new(),
            start_paused: false,
        }
    }
}

impl EngineConfig {
    /// Static configuration for the option lifecycle.
    #[must_use]
    pub fn lifecycle_config(&self) -> LifecycleConfig {
        let asset_bounds = self
            .assets
            .iter()
            .map(|(asset, bounds)| (AssetId::new(asset.as_str()), *bounds))
            .collect();
        LifecycleConfig {
            deployment_id: self.deployment_id.clone(),
            quote_asset: AssetId::new(self.quote_asset.as_str()),
            admin: Identity::new(self.admin.as_str()),
            protocol_account: Identity::new(self.protocol_account.as_str()),
            parameters: ProtocolParameters {
                safety_margin: BasisPoints::new(self.safety_margin_bps),
                liquidator_share: BasisPoints::new(self.liquidator_share_bps),
                asset_bounds,
                paused: self.start_paused,
            },
        }
    }
}

fn default_deployment_id() -> String {
    "settlement-engine".to_string()
}

fn default_quote_asset() -> String {
    "USDC".to_string()
}

fn default_protocol_account() -> String {
    "protocol".to_string()
}

pub(crate) const fn default_safety_margin_bps() -> u32 {
    1
}

pub(crate) const fn default_liquidator_share_bps() -> u32 {
    2_500
}
