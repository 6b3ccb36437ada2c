//! Settlement Engine
//!
//! Drives a [`SwapRequirement`] through the router: quote, validate,
//! execute, verify. The whole exchange is bounded by the caller's
//! deadline; running out of time is a router failure and leaves nothing
//! changed locally.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::application::ports::{Clock, LiquidityRouterPort, RouterError, SwapExecution};
use crate::domain::collateral::PositionSettlement;
use crate::domain::settlement::{
    ReturnCheck, SettlementError, SettlementPlan, SwapRequirement, VerifiedSwap,
};
use crate::domain::shared::{Amount, BasisPoints, Timestamp};
use crate::error::EngineError;
use crate::observability::record_router_call;

/// Caller-supplied settlement bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementParams {
    /// Least output the caller accepts from the router.
    pub min_return: Amount,
    /// Settlement must finish by this instant.
    pub deadline: Timestamp,
}

/// Router-facing half of settlement.
pub struct SettlementEngine {
    router: Arc<dyn LiquidityRouterPort>,
    clock: Arc<dyn Clock>,
}

impl SettlementEngine {
    /// Create a settlement engine.
    #[must_use]
    pub fn new(router: Arc<dyn LiquidityRouterPort>, clock: Arc<dyn Clock>) -> Self {
        Self { router, clock }
    }

    /// Execute a swap and return verified proceeds.
    ///
    /// # Errors
    ///
    /// - `InsufficientReturn` if `min_return` is below the requirement, the
    ///   quote is below `min_return`, or less than `min_return` arrives.
    /// - `ExcessivePriceMovement` if the quote breaches `max_price_movement`.
    /// - `ExternalRouterFailure` on router errors or when the deadline passes.
    pub async fn swap(
        &self,
        requirement: &SwapRequirement,
        params: &SettlementParams,
        max_price_movement: Option<BasisPoints>,
    ) -> Result<VerifiedSwap, EngineError> {
        requirement.check_min_return(params.min_return)?;

        let now = self.clock.now();
        if params.deadline <= now {
            return Err(EngineError::ExternalRouterFailure {
                message: format!("settlement deadline {} already passed", params.deadline),
            });
        }
        let budget = params
            .deadline
            .duration_since(now)
            .to_std()
            .unwrap_or_default();

        tokio::time::timeout(budget, self.run(requirement, params, max_price_movement))
            .await
            .map_err(|_| {
                tracing::warn!(deadline = %params.deadline, "Settlement deadline exceeded");
                EngineError::ExternalRouterFailure {
                    message: format!("settlement deadline {} exceeded", params.deadline),
                }
            })?
    }

    async fn run(
        &self,
        requirement: &SwapRequirement,
        params: &SettlementParams,
        max_price_movement: Option<BasisPoints>,
    ) -> Result<VerifiedSwap, EngineError> {
        let started = Instant::now();
        let quote = self
            .router
            .quote(requirement.from(), requirement.to(), requirement.amount_in())
            .await;
        record_router_call("quote", outcome(&quote), started.elapsed().as_secs_f64());
        let quote = quote.map_err(router_failure)?;

        let validated = requirement.validate_quote(quote, params.min_return, max_price_movement)?;
        tracing::debug!(
            from = %requirement.from(),
            to = %requirement.to(),
            amount_in = %requirement.amount_in(),
            quoted_out = %validated.quoted_out(),
            min_out = %validated.min_out(),
            "Quote validated"
        );

        let started = Instant::now();
        let executed = self
            .router
            .execute(SwapExecution {
                from: requirement.from().clone(),
                to: requirement.to().clone(),
                amount_in: requirement.amount_in(),
                min_out: validated.min_out(),
                route: validated.route().to_string(),
                deadline: params.deadline,
            })
            .await;
        record_router_call("execute", outcome(&executed), started.elapsed().as_secs_f64());
        let actual_out = executed.map_err(router_failure)?;

        Ok(validated.record_execution(actual_out).verify()?)
    }

    /// Turn a plan into ledger instructions, swapping if the plan needs it.
    ///
    /// # Errors
    ///
    /// As [`swap`](Self::swap); `InsufficientReturn` if a swap is needed and
    /// no `params` were given.
    pub async fn settle(
        &self,
        plan: SettlementPlan,
        params: Option<&SettlementParams>,
        max_price_movement: Option<BasisPoints>,
    ) -> Result<PositionSettlement, EngineError> {
        let Some(requirement) = plan.swap().cloned() else {
            return Ok(plan.settle_without_swap()?);
        };

        let params = params.ok_or(SettlementError::InsufficientReturn {
            check: ReturnCheck::MissingParameters,
            required: requirement.required_out(),
            actual: Amount::ZERO,
        })?;

        let verified = self.swap(&requirement, params, max_price_movement).await?;
        Ok(plan.settle_with(&verified)?)
    }
}

fn outcome<T>(result: &Result<T, RouterError>) -> &'static str {
    if result.is_ok() { "ok" } else { "error" }
}

fn router_failure(err: RouterError) -> EngineError {
    EngineError::ExternalRouterFailure {
        message: err.to_string(),
    }
}
