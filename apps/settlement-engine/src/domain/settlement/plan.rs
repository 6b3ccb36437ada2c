//! Settlement plans.
//!
//! With `A` the option amount, `K` the strike, `P` the settlement price and
//! `margin = P × A × safety_margin / 10000`:
//!
//! - CALL: sell `A` for at least `P × A`; the taker gets `(P − K) × A`, the
//!   LP `K × A − margin`, the protocol the margin.
//! - PUT: the escrow holds quote `H`. The taker gets
//!   `min((K − P) × A, H − margin)`, the protocol the margin, and the rest
//!   buys the underlying back for the LP.
//!
//! Anything received above the required amount goes to the protocol. A
//! liquidator forcing a profitable expiry is paid its share out of the
//! protocol margin.

use serde::Serialize;

use super::errors::SettlementError;
use super::protocol::{SwapRequirement, VerifiedSwap};
use crate::domain::collateral::{Credit, Escrow, PositionSettlement};
use crate::domain::commitment::OptionType;
use crate::domain::option_lifecycle::ActiveOption;
use crate::domain::shared::{Amount, AssetId, BasisPoints, Identity, OptionId, Price};

/// Liquidator's cut of the protocol margin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidatorShare {
    /// Account paid.
    pub liquidator: Identity,
    /// Share of the margin.
    pub share: BasisPoints,
}

/// Protocol parameters a plan is built under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementTerms {
    /// Currency strikes and prices are quoted in.
    pub quote_asset: AssetId,
    /// Margin retained by the protocol.
    pub safety_margin: BasisPoints,
    /// Protocol revenue account.
    pub protocol: Identity,
    /// Set when a liquidator forces the settlement.
    pub liquidator: Option<LiquidatorShare>,
}

/// How an escrow will be released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementPlan {
    option_id: OptionId,
    price: Price,
    swap: Option<SwapRequirement>,
    /// Paid straight out of the escrow.
    retained: Vec<Credit>,
    /// Paid out of the swap proceeds; sums to the required output.
    from_proceeds: Vec<Credit>,
    surplus_to: Identity,
}

impl SettlementPlan {
    /// Plan an in-the-money settlement (exercise or forced expiry).
    ///
    /// # Errors
    ///
    /// - `NotProfitable` if the taker is not in the money at `price`.
    /// - `EscrowMismatch` if the escrow does not hold what the option needs.
    /// - `ArithmeticOverflow` if a payout is too large to represent.
    pub fn in_the_money(
        option: &ActiveOption,
        escrow: &Escrow,
        price: Price,
        terms: &SettlementTerms,
    ) -> Result<Self, SettlementError> {
        if !option.is_profitable_at(price) {
            return Err(SettlementError::NotProfitable {
                option_id: option.id(),
                strike: option.strike_price(),
                price,
            });
        }

        match option.option_type() {
            OptionType::Call => Self::call(option, escrow, price, terms),
            OptionType::Put => Self::put(option, escrow, price, terms),
        }
    }

    fn call(
        option: &ActiveOption,
        escrow: &Escrow,
        price: Price,
        terms: &SettlementTerms,
    ) -> Result<Self, SettlementError> {
        if escrow.holding.asset != *option.asset() || escrow.holding.quantity != option.amount() {
            return Err(SettlementError::EscrowMismatch {
                option_id: option.id(),
                message: format!(
                    "expected {} {}, escrow holds {} {}",
                    option.amount(),
                    option.asset(),
                    escrow.holding.quantity,
                    escrow.holding.asset
                ),
            });
        }

        let amount = option.amount();
        let (fair, strike_value) = valuations(option, price)?;
        let margin = safety_margin(terms, fair)?.min(strike_value);

        let quote = &terms.quote_asset;
        let mut from_proceeds = vec![
            Credit::new(option.taker().clone(), quote.clone(), fair - strike_value),
            Credit::new(option.lp().clone(), quote.clone(), strike_value - margin),
        ];
        from_proceeds.extend(margin_credits(margin, quote, terms)?);

        Ok(Self {
            option_id: option.id(),
            price,
            swap: Some(SwapRequirement::sell_underlying(
                option.asset().clone(),
                quote.clone(),
                amount,
                price,
                fair,
            )),
            retained: Vec::new(),
            from_proceeds: non_zero(from_proceeds),
            surplus_to: terms.protocol.clone(),
        })
    }

    fn put(
        option: &ActiveOption,
        escrow: &Escrow,
        price: Price,
        terms: &SettlementTerms,
    ) -> Result<Self, SettlementError> {
        let quote = &terms.quote_asset;
        if escrow.holding.asset != *quote {
            return Err(SettlementError::EscrowMismatch {
                option_id: option.id(),
                message: format!(
                    "PUT escrow should hold {quote}, holds {}",
                    escrow.holding.asset
                ),
            });
        }

        let held = escrow.holding.quantity;
        let (fair, strike_value) = valuations(option, price)?;
        let margin = safety_margin(terms, fair)?.min(held);
        let intrinsic = strike_value - fair;
        let taker = intrinsic.min(held - margin);
        let buy_back = held - margin - taker;

        let mut retained = vec![Credit::new(option.taker().clone(), quote.clone(), taker)];
        retained.extend(margin_credits(margin, quote, terms)?);

        let (swap, from_proceeds) = if buy_back.is_positive() {
            let requirement =
                SwapRequirement::buy_underlying(quote.clone(), option.asset().clone(), buy_back, price)?;
            let lp_credit = Credit::new(
                option.lp().clone(),
                option.asset().clone(),
                requirement.required_out(),
            );
            (Some(requirement), vec![lp_credit])
        } else {
            (None, Vec::new())
        };

        Ok(Self {
            option_id: option.id(),
            price,
            swap,
            retained: non_zero(retained),
            from_proceeds: non_zero(from_proceeds),
            surplus_to: terms.protocol.clone(),
        })
    }

    /// Plan an out-of-the-money expiry: the whole escrow goes back to the LP.
    #[must_use]
    pub fn return_to_lp(option: &ActiveOption, escrow: &Escrow, price: Price) -> Self {
        Self {
            option_id: option.id(),
            price,
            swap: None,
            retained: non_zero(vec![Credit::new(
                option.lp().clone(),
                escrow.holding.asset.clone(),
                escrow.holding.quantity,
            )]),
            from_proceeds: Vec::new(),
            surplus_to: option.lp().clone(),
        }
    }

    /// Option the plan settles.
    #[must_use]
    pub const fn option_id(&self) -> OptionId {
        self.option_id
    }

    /// Settlement price.
    #[must_use]
    pub const fn price(&self) -> Price {
        self.price
    }

    /// Swap needed before distribution, if any.
    #[must_use]
    pub const fn swap(&self) -> Option<&SwapRequirement> {
        self.swap.as_ref()
    }

    /// Least the swap must return (zero if no swap is needed).
    #[must_use]
    pub fn required_return(&self) -> Amount {
        self.swap
            .as_ref()
            .map_or(Amount::ZERO, SwapRequirement::required_out)
    }

    /// Release an escrow that needs no swap.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolViolation` if the plan requires a swap.
    pub fn settle_without_swap(self) -> Result<PositionSettlement, SettlementError> {
        if self.swap.is_some() {
            return Err(SettlementError::ProtocolViolation {
                message: format!("option {} requires a swap before release", self.option_id),
            });
        }
        Ok(PositionSettlement {
            swap: None,
            credits: self.retained,
        })
    }

    /// Release an escrow with verified swap proceeds.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolViolation` if the plan needs no swap or `swap` was
    /// verified against a different requirement.
    pub fn settle_with(self, swap: &VerifiedSwap) -> Result<PositionSettlement, SettlementError> {
        match &self.swap {
            Some(requirement) if requirement == swap.requirement() => {}
            Some(_) => {
                return Err(SettlementError::ProtocolViolation {
                    message: format!("swap does not belong to option {}", self.option_id),
                });
            }
            None => {
                return Err(SettlementError::ProtocolViolation {
                    message: format!("option {} needs no swap", self.option_id),
                });
            }
        }

        let mut credits = self.retained;
        credits.extend(self.from_proceeds);
        let surplus = swap.surplus();
        if surplus.is_positive() {
            credits.push(Credit::new(
                self.surplus_to,
                swap.requirement().to().clone(),
                surplus,
            ));
        }

        Ok(PositionSettlement {
            swap: Some(swap.record()),
            credits,
        })
    }
}

/// `(P × A, K × A)` for the option at `price`.
fn valuations(option: &ActiveOption, price: Price) -> Result<(Amount, Amount), SettlementError> {
    let amount = option.amount();
    let fair = price
        .checked_value_of(amount)
        .ok_or(SettlementError::overflow("fair value"))?;
    let strike_value = option
        .strike_price()
        .checked_value_of(amount)
        .ok_or(SettlementError::overflow("strike value"))?;
    Ok((fair, strike_value))
}

fn safety_margin(terms: &SettlementTerms, fair: Amount) -> Result<Amount, SettlementError> {
    terms
        .safety_margin
        .apply(fair.value())
        .map(Amount::new)
        .ok_or(SettlementError::overflow("safety margin"))
}

/// Margin split between the protocol and an optional liquidator.
fn margin_credits(
    margin: Amount,
    asset: &AssetId,
    terms: &SettlementTerms,
) -> Result<Vec<Credit>, SettlementError> {
    let incentive = match &terms.liquidator {
        Some(l) => l
            .share
            .apply(margin.value())
            .map(|v| Amount::new(v).min(margin))
            .ok_or(SettlementError::overflow("liquidator share"))?,
        None => Amount::ZERO,
    };
    let mut credits = vec![Credit::new(
        terms.protocol.clone(),
        asset.clone(),
        margin - incentive,
    )];
    if let Some(l) = &terms.liquidator {
        credits.push(Credit::new(l.liquidator.clone(), asset.clone(), incentive));
    }
    Ok(credits)
}

fn non_zero(credits: Vec<Credit>) -> Vec<Credit> {
    credits.into_iter().filter(|c| c.quantity.is_positive()).collect()
}
