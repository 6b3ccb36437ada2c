//! Price Oracle Port (Driven Port)

use async_trait::async_trait;

use crate::domain::shared::{AssetId, Price};

/// Oracle error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// No price for this asset.
    #[error("No price for asset {asset}")]
    UnknownAsset {
        /// Asset.
        asset: AssetId,
    },

    /// Oracle could not be reached.
    #[error("Price oracle unavailable: {message}")]
    Unavailable {
        /// Details.
        message: String,
    },

    /// Oracle returned a zero, negative or unparseable price.
    #[error("Invalid price: {message}")]
    InvalidPrice {
        /// Details.
        message: String,
    },
}

/// Port for current market prices, quoted in the engine's quote asset.
#[async_trait]
pub trait PriceOraclePort: Send + Sync {
    /// Current price of one unit of `asset`.
    async fn price(&self, asset: &AssetId) -> Result<Price, OracleError>;
}
