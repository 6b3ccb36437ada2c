//! Premium Calculator
//!
//! Prices a chosen lock duration against a commitment.
//!
//! - OFFER: `premium = premium_rate × duration_days` (the LP is paid per day locked)
//! - DEMAND: `premium = premium_rate` (the demander fixed the total up front)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::commitment::{Commitment, CommitmentType};
use crate::domain::shared::{Amount, Price};

/// Days used to annualize a daily yield.
const DAYS_PER_YEAR: u32 = 365;

/// Yield figures shown alongside a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldMetrics {
    /// Premium per day relative to collateral value, in basis points.
    pub daily_yield_bps: Decimal,
    /// `daily_yield_bps × 365`.
    pub annualized_yield_bps: Decimal,
}

/// Stateless premium pricing.
pub struct PremiumCalculator;

impl PremiumCalculator {
    /// Whether `duration_days` lies in the commitment's declared range (inclusive).
    #[must_use]
    pub fn is_valid_duration(commitment: &Commitment, duration_days: u16) -> bool {
        (commitment.min_duration_days..=commitment.max_duration_days).contains(&duration_days)
    }

    /// Premium owed for locking the commitment for `duration_days`, or
    /// `None` if it is too large to represent.
    #[must_use]
    pub fn premium_for(commitment: &Commitment, duration_days: u16) -> Option<Amount> {
        match commitment.commitment_type {
            CommitmentType::Offer => commitment
                .premium_rate
                .checked_mul(Decimal::from(duration_days)),
            CommitmentType::Demand => Some(commitment.premium_rate),
        }
    }

    /// Daily and annualized yield for the LP at `current_price`.
    ///
    /// The collateral value is formed before dividing so small amounts keep
    /// their precision. Returns `None` when the duration or the collateral
    /// value is zero, or a figure is too large to represent.
    #[must_use]
    pub fn yield_metrics(
        commitment: &Commitment,
        duration_days: u16,
        current_price: Price,
    ) -> Option<YieldMetrics> {
        if duration_days == 0 {
            return None;
        }
        let collateral_value = current_price.checked_value_of(commitment.amount)?.value();
        if collateral_value <= Decimal::ZERO {
            return None;
        }

        let premium = Self::premium_for(commitment, duration_days)?.value();
        let daily_yield_bps = premium
            .checked_mul(Decimal::from(10_000))?
            .checked_div(collateral_value.checked_mul(Decimal::from(duration_days))?)?;

        Some(YieldMetrics {
            daily_yield_bps,
            annualized_yield_bps: daily_yield_bps.checked_mul(Decimal::from(DAYS_PER_YEAR))?,
        })
    }
}
