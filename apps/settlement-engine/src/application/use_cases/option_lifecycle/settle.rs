//! Exercise and post-deadline liquidation.
//!
//! Both paths run under the option's single-flight guard: validate, plan,
//! run the router protocol, then release the escrow and transition the
//! option together. A failure anywhere before the release leaves the option
//! TAKEN with its escrow intact.

use std::collections::BTreeMap;

use super::OptionLifecycle;
use crate::application::dto::{ExerciseRequest, LiquidationParams, SettlementReceipt};
use crate::application::services::{FlightGuard, SettlementParams};
use crate::domain::collateral::{Escrow, PositionSettlement};
use crate::domain::option_lifecycle::{ActiveOption, ExpiryBranch, OptionState};
use crate::domain::settlement::{LiquidatorShare, SettlementPlan, SettlementTerms};
use crate::domain::shared::{Amount, AssetId, BasisPoints, Identity, OptionId, Price};
use crate::error::EngineError;
use crate::observability::{
    record_operation_rejected, record_option_exercised, record_option_expired,
    record_protocol_revenue, record_settlement_failure,
};

/// How a TAKEN option will leave that state.
enum Resolution {
    Exercise,
    Expire {
        liquidator: Identity,
        branch: ExpiryBranch,
    },
}

impl OptionLifecycle {
    /// Exercise an in-the-money option before its deadline.
    ///
    /// # Errors
    ///
    /// - `SettlementInFlight` if another settlement holds the option.
    /// - `OptionNotFound`, `Unauthorized` (caller is not the taker).
    /// - `NotExercisable` if the option is not TAKEN, the deadline passed,
    ///   or the taker is not in the money.
    /// - Router protocol errors: `InsufficientReturn`,
    ///   `ExcessivePriceMovement`, `ExternalRouterFailure`.
    pub async fn exercise(
        &self,
        caller: &Identity,
        option_id: OptionId,
        request: ExerciseRequest,
    ) -> Result<SettlementReceipt, EngineError> {
        let result = self.exercise_inner(caller, option_id, request).await;
        if let Err(e) = &result {
            tracing::warn!(
                caller = %caller,
                option_id = %option_id,
                code = %e.code(),
                error = %e,
                "Exercise rejected"
            );
            record_operation_rejected("exercise", e.code().reason());
        }
        result
    }

    async fn exercise_inner(
        &self,
        caller: &Identity,
        option_id: OptionId,
        request: ExerciseRequest,
    ) -> Result<SettlementReceipt, EngineError> {
        let _flight = self.acquire_flight(option_id)?;
        let option = self.load_option(option_id).await?;

        if option.taker() != caller {
            return Err(EngineError::Unauthorized {
                message: format!("only the taker of option {option_id} may exercise it"),
            });
        }
        require_taken(&option)?;
        let now = self.clock.now();
        if !option.is_exercisable_at(now) {
            return Err(EngineError::not_exercisable(
                option_id,
                format!("exercise deadline {} has passed", option.exercise_deadline()),
            ));
        }

        let price = self.price_of(option.asset()).await?;
        if !option.is_profitable_at(price) {
            return Err(EngineError::not_exercisable(
                option_id,
                format!(
                    "{} at strike {} is not in the money at {price}",
                    option.option_type(),
                    option.strike_price()
                ),
            ));
        }

        let escrow = self.escrow_of(option_id)?;
        let plan = SettlementPlan::in_the_money(&option, &escrow, price, &self.settlement_terms(None))?;
        let payout = self
            .run_settlement(plan, Some(&request.settlement), request.max_price_movement_bps)
            .await?;

        self.finalize(option, price, payout, Resolution::Exercise).await
    }

    /// Resolve a TAKEN option whose deadline has passed. Callable by anyone.
    ///
    /// In the money, the option is settled as in [`exercise`](Self::exercise)
    /// and the caller earns the liquidator share of the margin. Otherwise the
    /// escrow goes back to the LP without touching the router.
    ///
    /// # Errors
    ///
    /// - `SettlementInFlight`, `OptionNotFound`.
    /// - `NotExercisable` if the option is not TAKEN or the deadline has not
    ///   passed.
    /// - Router protocol errors on the in-the-money branch.
    pub async fn liquidate_expired(
        &self,
        caller: &Identity,
        option_id: OptionId,
        params: LiquidationParams,
    ) -> Result<SettlementReceipt, EngineError> {
        let result = self.liquidate_inner(caller, option_id, params).await;
        if let Err(e) = &result {
            tracing::warn!(
                caller = %caller,
                option_id = %option_id,
                code = %e.code(),
                error = %e,
                "Liquidation rejected"
            );
            record_operation_rejected("liquidate", e.code().reason());
        }
        result
    }

    async fn liquidate_inner(
        &self,
        caller: &Identity,
        option_id: OptionId,
        params: LiquidationParams,
    ) -> Result<SettlementReceipt, EngineError> {
        let _flight = self.acquire_flight(option_id)?;
        let option = self.load_option(option_id).await?;
        let (plan, branch) = self.liquidation_plan(&option, caller).await?;
        let price = plan.price();

        let payout = self
            .run_settlement(plan, params.settlement.as_ref(), params.max_price_movement_bps)
            .await?;

        self.finalize(
            option,
            price,
            payout,
            Resolution::Expire {
                liquidator: caller.clone(),
                branch,
            },
        )
        .await
    }

    /// The plan a liquidation of `option_id` by `liquidator` would follow
    /// right now. Keepers read `required_return()` from it.
    ///
    /// # Errors
    ///
    /// As [`liquidate_expired`](Self::liquidate_expired), without router errors.
    pub async fn plan_liquidation(
        &self,
        liquidator: &Identity,
        option_id: OptionId,
    ) -> Result<SettlementPlan, EngineError> {
        let option = self.load_option(option_id).await?;
        self.liquidation_plan(&option, liquidator)
            .await
            .map(|(plan, _)| plan)
    }

    async fn liquidation_plan(
        &self,
        option: &ActiveOption,
        liquidator: &Identity,
    ) -> Result<(SettlementPlan, ExpiryBranch), EngineError> {
        require_taken(option)?;
        let now = self.clock.now();
        if !option.is_past_deadline(now) {
            return Err(EngineError::not_exercisable(
                option.id(),
                format!("exercise deadline {} has not passed", option.exercise_deadline()),
            ));
        }

        let price = self.price_of(option.asset()).await?;
        let escrow = self.escrow_of(option.id())?;
        if option.is_profitable_at(price) {
            let share = self.parameters.read().liquidator_share;
            let terms = self.settlement_terms(Some(LiquidatorShare {
                liquidator: liquidator.clone(),
                share,
            }));
            let plan = SettlementPlan::in_the_money(option, &escrow, price, &terms)?;
            Ok((plan, ExpiryBranch::ForcedSettlement))
        } else {
            Ok((
                SettlementPlan::return_to_lp(option, &escrow, price),
                ExpiryBranch::ReturnedToLp,
            ))
        }
    }

    fn acquire_flight(&self, option_id: OptionId) -> Result<FlightGuard<OptionId>, EngineError> {
        self.in_flight
            .try_acquire(option_id)
            .ok_or(EngineError::SettlementInFlight { option_id })
    }

    fn escrow_of(&self, option_id: OptionId) -> Result<Escrow, EngineError> {
        self.ledger
            .escrow(option_id)
            .ok_or_else(|| EngineError::InvariantViolation {
                message: format!("TAKEN option {option_id} has no escrow"),
            })
    }

    fn settlement_terms(&self, liquidator: Option<LiquidatorShare>) -> SettlementTerms {
        SettlementTerms {
            quote_asset: self.quote_asset.clone(),
            safety_margin: self.parameters.read().safety_margin,
            protocol: self.protocol_account.clone(),
            liquidator,
        }
    }

    async fn run_settlement(
        &self,
        plan: SettlementPlan,
        params: Option<&SettlementParams>,
        max_price_movement: Option<BasisPoints>,
    ) -> Result<PositionSettlement, EngineError> {
        let option_id = plan.option_id();
        self.settlement
            .settle(plan, params, max_price_movement)
            .await
            .inspect_err(|e| {
                tracing::warn!(option_id = %option_id, code = %e.code(), error = %e, "Settlement failed");
                record_settlement_failure(e.code().reason());
            })
    }

    /// Release the escrow and record the terminal state as one step.
    async fn finalize(
        &self,
        mut option: ActiveOption,
        price: Price,
        payout: PositionSettlement,
        resolution: Resolution,
    ) -> Result<SettlementReceipt, EngineError> {
        let option_id = option.id();
        let now = self.clock.now();
        let branch = match &resolution {
            Resolution::Exercise => None,
            Resolution::Expire { branch, .. } => Some(*branch),
        };

        {
            let _books = self.books.lock().await;
            match resolution {
                Resolution::Exercise => option.mark_exercised(price, payout.credits.clone(), now)?,
                Resolution::Expire { liquidator, branch } => {
                    option.mark_expired(liquidator, branch, price, payout.credits.clone(), now)?;
                }
            }
            self.ledger.settle(option_id, &payout)?;
            if let Err(e) = self.options.save(&option).await {
                tracing::error!(
                    option_id = %option_id,
                    error = %e,
                    "Escrow released but terminal state not persisted"
                );
                return Err(e.into());
            }
        }

        match branch {
            None => {
                tracing::info!(
                    option_id = %option_id,
                    taker = %option.taker(),
                    price = %price,
                    credits = payout.credits.len(),
                    "Option exercised"
                );
                record_option_exercised(option.asset(), &option.option_type().to_string());
            }
            Some(branch) => {
                tracing::info!(
                    option_id = %option_id,
                    branch = branch.as_str(),
                    price = %price,
                    credits = payout.credits.len(),
                    "Option expired"
                );
                record_option_expired(option.asset(), branch.as_str());
            }
        }
        for (asset, amount) in self.revenue_in(&payout) {
            record_protocol_revenue(&asset, amount);
        }
        self.report_locked(option.asset());
        self.publish(option.drain_events()).await;

        Ok(SettlementReceipt {
            option_id,
            state: option.state(),
            branch,
            settlement_price: price,
            swap: payout.swap,
            payouts: payout.credits,
        })
    }

    fn revenue_in(&self, payout: &PositionSettlement) -> BTreeMap<AssetId, Amount> {
        let mut revenue: BTreeMap<AssetId, Amount> = BTreeMap::new();
        for credit in payout
            .credits
            .iter()
            .filter(|c| c.owner == self.protocol_account)
        {
            let entry = revenue.entry(credit.asset.clone()).or_insert(Amount::ZERO);
            *entry = entry.saturating_add(credit.quantity);
        }
        revenue
    }
}

fn require_taken(option: &ActiveOption) -> Result<(), EngineError> {
    if option.state() == OptionState::Taken {
        Ok(())
    } else {
        Err(EngineError::not_exercisable(
            option.id(),
            format!("option is {}", option.state()),
        ))
    }
}
