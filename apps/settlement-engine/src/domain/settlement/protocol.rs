//! Quote → Execute → Verify.
//!
//! Each stage can only be built from the one before it; constructors are
//! private to this module.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::errors::{ReturnCheck, SettlementError};
use crate::domain::collateral::{Holding, SwapRecord};
use crate::domain::shared::{Amount, AssetId, BasisPoints, Price};

/// Decimal places kept when converting quote currency into the underlying.
pub(crate) const ASSET_SCALE: u32 = 18;

/// Quote returned by the liquidity router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteQuote {
    /// Output the router expects to deliver.
    pub expected_out: Amount,
    /// Opaque route descriptor, passed back on execution.
    pub route: String,
}

/// Which side of the underlying a swap is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapDirection {
    /// Underlying in, quote currency out.
    SellUnderlying,
    /// Quote currency in, underlying out.
    BuyUnderlying,
}

/// A swap the engine needs, and the least it must return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequirement {
    from: AssetId,
    to: AssetId,
    amount_in: Amount,
    required_out: Amount,
    direction: SwapDirection,
    reference_price: Price,
}

impl SwapRequirement {
    /// Sell `amount` of the underlying; at least `required_out` quote back.
    #[must_use]
    pub fn sell_underlying(
        asset: AssetId,
        quote_asset: AssetId,
        amount: Amount,
        reference_price: Price,
        required_out: Amount,
    ) -> Self {
        Self {
            from: asset,
            to: quote_asset,
            amount_in: amount,
            required_out,
            direction: SwapDirection::SellUnderlying,
            reference_price,
        }
    }

    /// Spend `quote_in` on the underlying; at least `quote_in / price` back,
    /// rounded down.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the output is too large to represent.
    pub fn buy_underlying(
        quote_asset: AssetId,
        asset: AssetId,
        quote_in: Amount,
        reference_price: Price,
    ) -> Result<Self, SettlementError> {
        let required_out = if reference_price.value().is_zero() {
            Amount::ZERO
        } else {
            let out = quote_in
                .value()
                .checked_div(reference_price.value())
                .ok_or(SettlementError::overflow("buy-back output"))?;
            Amount::new(out.round_dp_with_strategy(ASSET_SCALE, RoundingStrategy::ToZero))
        };
        Ok(Self {
            from: quote_asset,
            to: asset,
            amount_in: quote_in,
            required_out,
            direction: SwapDirection::BuyUnderlying,
            reference_price,
        })
    }

    /// Take-time conversion of PUT collateral: sell `amount` at `strike`
    /// keeping `strike × amount × (10000 − margin) / 10000`.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the strike value is too large to
    /// represent.
    pub fn put_collateral_conversion(
        asset: AssetId,
        quote_asset: AssetId,
        amount: Amount,
        strike: Price,
        margin: BasisPoints,
    ) -> Result<Self, SettlementError> {
        let required_out = strike
            .checked_value_of(amount)
            .and_then(|value| margin.complement().apply(value.value()))
            .map(Amount::new)
            .ok_or(SettlementError::overflow("conversion proceeds"))?;
        Ok(Self::sell_underlying(asset, quote_asset, amount, strike, required_out))
    }

    /// Asset sent to the router.
    #[must_use]
    pub const fn from(&self) -> &AssetId {
        &self.from
    }

    /// Asset received from the router.
    #[must_use]
    pub const fn to(&self) -> &AssetId {
        &self.to
    }

    /// Input amount.
    #[must_use]
    pub const fn amount_in(&self) -> Amount {
        self.amount_in
    }

    /// Least acceptable output.
    #[must_use]
    pub const fn required_out(&self) -> Amount {
        self.required_out
    }

    /// Swap direction.
    #[must_use]
    pub const fn direction(&self) -> SwapDirection {
        self.direction
    }

    /// Price the requirement was derived from.
    #[must_use]
    pub const fn reference_price(&self) -> Price {
        self.reference_price
    }

    /// Underlying price a quote implies, in quote currency.
    fn implied_price(&self, out: Amount) -> Option<Decimal> {
        match self.direction {
            SwapDirection::SellUnderlying if self.amount_in.is_positive() => {
                out.value().checked_div(self.amount_in.value())
            }
            SwapDirection::BuyUnderlying if out.is_positive() => {
                self.amount_in.value().checked_div(out.value())
            }
            _ => None,
        }
    }

    /// Reject a caller minimum that is zero or below the required amount.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientReturn(MinReturn)`.
    pub fn check_min_return(&self, min_return: Amount) -> Result<(), SettlementError> {
        if !min_return.is_positive() || min_return < self.required_out {
            return Err(SettlementError::InsufficientReturn {
                check: ReturnCheck::MinReturn,
                required: self.required_out,
                actual: min_return,
            });
        }
        Ok(())
    }

    /// Check the caller's minimum and the router's quote before anything is
    /// sent to the router.
    ///
    /// # Errors
    ///
    /// - `InsufficientReturn(MinReturn)` if `min_return` is zero or below
    ///   the required amount.
    /// - `InsufficientReturn(Quote)` if the quote is below `min_return`.
    /// - `ExcessivePriceMovement` if the implied price deviates from the
    ///   reference price by more than `max_price_movement`.
    pub fn validate_quote(
        &self,
        quote: RouteQuote,
        min_return: Amount,
        max_price_movement: Option<BasisPoints>,
    ) -> Result<ValidatedQuote, SettlementError> {
        self.check_min_return(min_return)?;

        if quote.expected_out < min_return {
            return Err(SettlementError::InsufficientReturn {
                check: ReturnCheck::Quote,
                required: min_return,
                actual: quote.expected_out,
            });
        }

        if let Some(max_bps) = max_price_movement {
            let implied = self.implied_price(quote.expected_out).unwrap_or(Decimal::ZERO);
            let deviation_bps = Price::new(implied)
                .deviation_bps(self.reference_price)
                .unwrap_or(Decimal::MAX);
            if deviation_bps > Decimal::from(max_bps.value()) {
                return Err(SettlementError::ExcessivePriceMovement {
                    oracle: self.reference_price,
                    implied,
                    deviation_bps,
                    max_bps,
                });
            }
        }

        Ok(ValidatedQuote {
            requirement: self.clone(),
            route: quote.route,
            quoted_out: quote.expected_out,
            min_out: min_return,
        })
    }
}

/// A quote that passed pre-execution checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuote {
    requirement: SwapRequirement,
    route: String,
    quoted_out: Amount,
    min_out: Amount,
}

impl ValidatedQuote {
    /// The requirement this quote satisfies.
    #[must_use]
    pub const fn requirement(&self) -> &SwapRequirement {
        &self.requirement
    }

    /// Route descriptor to execute.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Router's quoted output. Informational only.
    #[must_use]
    pub const fn quoted_out(&self) -> Amount {
        self.quoted_out
    }

    /// Minimum output to pass to the router.
    #[must_use]
    pub const fn min_out(&self) -> Amount {
        self.min_out
    }

    /// Record what the router reports it delivered.
    #[must_use]
    pub fn record_execution(self, actual_out: Amount) -> ExecutedSwap {
        ExecutedSwap {
            quote: self,
            actual_out,
        }
    }
}

/// A swap the router claims to have executed, not yet verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedSwap {
    quote: ValidatedQuote,
    actual_out: Amount,
}

impl ExecutedSwap {
    /// Reported output.
    #[must_use]
    pub const fn actual_out(&self) -> Amount {
        self.actual_out
    }

    /// Re-check the received amount against the validated minimum.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientReturn(Execution)` if less than `min_out`
    /// arrived.
    pub fn verify(self) -> Result<VerifiedSwap, SettlementError> {
        if self.actual_out < self.quote.min_out {
            return Err(SettlementError::InsufficientReturn {
                check: ReturnCheck::Execution,
                required: self.quote.min_out,
                actual: self.actual_out,
            });
        }
        Ok(VerifiedSwap {
            requirement: self.quote.requirement,
            actual_out: self.actual_out,
        })
    }
}

/// Proceeds that cleared every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSwap {
    requirement: SwapRequirement,
    actual_out: Amount,
}

impl VerifiedSwap {
    /// The requirement that was met.
    #[must_use]
    pub const fn requirement(&self) -> &SwapRequirement {
        &self.requirement
    }

    /// Amount received.
    #[must_use]
    pub const fn actual_out(&self) -> Amount {
        self.actual_out
    }

    /// Received beyond the required amount.
    #[must_use]
    pub fn surplus(&self) -> Amount {
        self.actual_out.saturating_sub(self.requirement.required_out)
    }

    /// Proceeds as a holding.
    #[must_use]
    pub fn proceeds(&self) -> Holding {
        Holding::new(self.requirement.to.clone(), self.actual_out)
    }

    /// Ledger record of the swap.
    #[must_use]
    pub fn record(&self) -> SwapRecord {
        SwapRecord {
            sold: Holding::new(self.requirement.from.clone(), self.requirement.amount_in),
            bought: self.proceeds(),
        }
    }
}
