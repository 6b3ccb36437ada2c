//! Domain events for the option lifecycle.

use serde::{Deserialize, Serialize};

use crate::domain::collateral::Credit;
use crate::domain::commitment::{CommitmentType, OptionType};
use crate::domain::shared::{Amount, AssetId, CommitmentHash, Identity, OptionId, Price, Timestamp};

/// All option events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionEvent {
    /// Commitment taken, position opened.
    Taken(OptionTaken),
    /// Taker exercised before the deadline.
    Exercised(OptionExercised),
    /// Position resolved after the deadline.
    Expired(OptionExpired),
}

impl OptionEvent {
    /// Option this event belongs to.
    #[must_use]
    pub const fn option_id(&self) -> OptionId {
        match self {
            Self::Taken(e) => e.option_id,
            Self::Exercised(e) => e.option_id,
            Self::Expired(e) => e.option_id,
        }
    }

    /// When the event occurred.
    #[must_use]
    pub const fn occurred_at(&self) -> Timestamp {
        match self {
            Self::Taken(e) => e.occurred_at,
            Self::Exercised(e) => e.occurred_at,
            Self::Expired(e) => e.occurred_at,
        }
    }

    /// Event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Taken(_) => "OPTION_TAKEN",
            Self::Exercised(_) => "OPTION_EXERCISED",
            Self::Expired(_) => "OPTION_EXPIRED",
        }
    }
}

/// Event: commitment taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionTaken {
    /// Option id.
    pub option_id: OptionId,
    /// Hash of the consumed commitment.
    pub commitment_hash: CommitmentHash,
    /// Premium payer.
    pub taker: Identity,
    /// Collateral provider.
    pub lp: Identity,
    /// Underlying.
    pub asset: AssetId,
    /// Underlying quantity.
    pub amount: Amount,
    /// Strike locked at take time.
    pub strike_price: Price,
    /// Premium paid to the LP.
    pub premium: Amount,
    /// CALL or PUT.
    pub option_type: OptionType,
    /// OFFER or DEMAND.
    pub commitment_type: CommitmentType,
    /// Last instant the taker may exercise.
    pub exercise_deadline: Timestamp,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: option exercised by its taker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionExercised {
    /// Option id.
    pub option_id: OptionId,
    /// Taker who exercised.
    pub taker: Identity,
    /// Oracle price the settlement used.
    pub settlement_price: Price,
    /// Credits released from the escrow.
    pub payouts: Vec<Credit>,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// How an expired option was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpiryBranch {
    /// Out of the money: escrow returned to the LP, no swap.
    ReturnedToLp,
    /// In the money: settled like an exercise on the taker's behalf.
    ForcedSettlement,
}

impl ExpiryBranch {
    /// Label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ReturnedToLp => "returned_to_lp",
            Self::ForcedSettlement => "forced_settlement",
        }
    }
}

/// Event: option resolved after its deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionExpired {
    /// Option id.
    pub option_id: OptionId,
    /// Whoever triggered the liquidation.
    pub liquidator: Identity,
    /// Resolution branch.
    pub branch: ExpiryBranch,
    /// Oracle price at evaluation.
    pub settlement_price: Price,
    /// Credits released from the escrow.
    pub payouts: Vec<Credit>,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}
