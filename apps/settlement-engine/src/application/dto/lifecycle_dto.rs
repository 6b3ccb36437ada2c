//! Option lifecycle DTOs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::services::SettlementParams;
use crate::domain::collateral::{Credit, Holding, SwapRecord};
use crate::domain::commitment::{CommitmentType, OptionType, SignedCommitment};
use crate::domain::option_lifecycle::{ActiveOption, ExpiryBranch, OptionState};
use crate::domain::shared::{
    Amount, AssetId, BasisPoints, CommitmentHash, Identity, OptionId, Price, Timestamp,
};

/// Request to take a signed commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakeRequest {
    /// Commitment and signature.
    pub signed: SignedCommitment,
    /// Chosen lock duration.
    pub duration_days: u16,
    /// Bounds for the take-time PUT conversion. Ignored for CALLs.
    #[serde(default)]
    pub settlement: Option<SettlementParams>,
    /// Tolerated quote deviation from the oracle for the PUT conversion.
    #[serde(default)]
    pub max_price_movement_bps: Option<BasisPoints>,
}

/// Request to take a commitment already published to the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakePublishedRequest {
    /// Chosen lock duration.
    pub duration_days: u16,
    /// Bounds for the take-time PUT conversion. Ignored for CALLs.
    #[serde(default)]
    pub settlement: Option<SettlementParams>,
    /// Tolerated quote deviation from the oracle for the PUT conversion.
    #[serde(default)]
    pub max_price_movement_bps: Option<BasisPoints>,
}

/// Result of a successful take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakeReceipt {
    /// New option id.
    pub option_id: OptionId,
    /// Consumed commitment.
    pub commitment_hash: CommitmentHash,
    /// Collateral provider.
    pub lp: Identity,
    /// Premium payer.
    pub taker: Identity,
    /// Strike locked at take time.
    pub strike_price: Price,
    /// Premium paid to the LP.
    pub premium: Amount,
    /// Last instant to exercise.
    pub exercise_deadline: Timestamp,
    /// What the position's escrow holds.
    pub escrow: Holding,
}

/// Request to exercise an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseRequest {
    /// Settlement bounds.
    pub settlement: SettlementParams,
    /// Tolerated quote deviation from the oracle.
    #[serde(default)]
    pub max_price_movement_bps: Option<BasisPoints>,
}

/// Parameters for liquidating an expired option.
///
/// `settlement` is only needed when the option expires in the money.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationParams {
    /// Settlement bounds for a forced settlement.
    #[serde(default)]
    pub settlement: Option<SettlementParams>,
    /// Tolerated quote deviation from the oracle.
    #[serde(default)]
    pub max_price_movement_bps: Option<BasisPoints>,
}

/// Result of an exercise or liquidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    /// Settled option.
    pub option_id: OptionId,
    /// Terminal state reached.
    pub state: OptionState,
    /// Expiry branch, for liquidations.
    pub branch: Option<ExpiryBranch>,
    /// Oracle price used.
    pub settlement_price: Price,
    /// Swap performed, if any.
    pub swap: Option<SwapRecord>,
    /// Credits released from the escrow.
    pub payouts: Vec<Credit>,
}

/// Premium and yield for a prospective take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumQuoteDto {
    /// Premium owed.
    pub premium: Amount,
    /// Current oracle price.
    pub price: Price,
    /// Daily yield on collateral value, bps.
    pub daily_yield_bps: Option<Decimal>,
    /// Annualized yield, bps.
    pub annualized_yield_bps: Option<Decimal>,
}

/// Option as exposed at API boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDto {
    /// Option id.
    pub id: OptionId,
    /// Originating commitment.
    pub commitment_hash: CommitmentHash,
    /// Premium payer.
    pub taker: Identity,
    /// Collateral provider.
    pub lp: Identity,
    /// Underlying.
    pub asset: AssetId,
    /// Underlying quantity.
    pub amount: Amount,
    /// Strike.
    pub strike_price: Price,
    /// Premium paid.
    pub total_premium_paid: Amount,
    /// Lock duration.
    pub lock_duration_days: u16,
    /// Take instant.
    pub taken_at: Timestamp,
    /// Exercise deadline.
    pub exercise_deadline: Timestamp,
    /// CALL or PUT.
    pub option_type: OptionType,
    /// OFFER or DEMAND.
    pub commitment_type: CommitmentType,
    /// Current state.
    pub state: OptionState,
    /// Terminal transition instant.
    pub settled_at: Option<Timestamp>,
}

impl OptionDto {
    /// Create from the aggregate.
    #[must_use]
    pub fn from_option(option: &ActiveOption) -> Self {
        Self {
            id: option.id(),
            commitment_hash: option.commitment_hash().clone(),
            taker: option.taker().clone(),
            lp: option.lp().clone(),
            asset: option.asset().clone(),
            amount: option.amount(),
            strike_price: option.strike_price(),
            total_premium_paid: option.total_premium_paid(),
            lock_duration_days: option.lock_duration_days(),
            taken_at: option.taken_at(),
            exercise_deadline: option.exercise_deadline(),
            option_type: option.option_type(),
            commitment_type: option.commitment_type(),
            state: option.state(),
            settled_at: option.settled_at(),
        }
    }
}
