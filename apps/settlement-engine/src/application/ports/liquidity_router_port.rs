//! Liquidity Router Port (Driven Port)
//!
//! Opaque quote + execute swap service. Both calls may fail or return
//! adversarial values; the engine only distributes amounts that passed
//! [`crate::domain::settlement`] verification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::settlement::RouteQuote;
use crate::domain::shared::{Amount, AssetId, Timestamp};

/// Router error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    /// Router could not be reached.
    #[error("Router unavailable: {message}")]
    Unavailable {
        /// Details.
        message: String,
    },

    /// Router refused the request (no route, slippage, ...).
    #[error("Router rejected request: {message}")]
    Rejected {
        /// Details.
        message: String,
    },

    /// Router response could not be understood.
    #[error("Invalid router response: {message}")]
    InvalidResponse {
        /// Details.
        message: String,
    },
}

/// A swap to execute along a previously quoted route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapExecution {
    /// Asset sold.
    pub from: AssetId,
    /// Asset bought.
    pub to: AssetId,
    /// Amount sold.
    pub amount_in: Amount,
    /// Router must revert below this output.
    pub min_out: Amount,
    /// Route descriptor from the quote.
    pub route: String,
    /// Router must not execute after this instant.
    pub deadline: Timestamp,
}

/// Port for the external liquidity router.
#[async_trait]
pub trait LiquidityRouterPort: Send + Sync {
    /// Quote swapping `amount` of `from` into `to`.
    async fn quote(
        &self,
        from: &AssetId,
        to: &AssetId,
        amount: Amount,
    ) -> Result<RouteQuote, RouterError>;

    /// Execute a swap, returning the amount actually received.
    async fn execute(&self, swap: SwapExecution) -> Result<Amount, RouterError>;
}
