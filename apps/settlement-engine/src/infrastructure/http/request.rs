//! HTTP request DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::commitment::Commitment;
use crate::domain::option_lifecycle::OptionState;
use crate::domain::shared::{Amount, AssetId, BasisPoints};

/// Price a commitment for a duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotePremiumRequest {
    /// Commitment to price.
    pub commitment: Commitment,
    /// Duration in days.
    pub duration_days: u16,
}

/// Deposit into or withdraw from the caller's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Asset moved.
    pub asset: AssetId,
    /// Quantity moved.
    pub amount: Amount,
}

/// Filter for listing options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptionsQuery {
    /// Only options in this state.
    #[serde(default)]
    pub state: Option<OptionState>,
}

/// New safety margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyMarginRequest {
    /// Margin in basis points.
    pub bps: BasisPoints,
}
