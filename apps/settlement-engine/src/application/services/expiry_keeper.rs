//! Expiry Keeper Service
//!
//! Background sweep that liquidates TAKEN options past their exercise
//! deadline. The keeper never trusts a router quote for its threshold: the
//! `min_return` it submits is the settlement plan's own required return.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tokio_util::sync::CancellationToken;

use super::SettlementParams;
use crate::application::dto::LiquidationParams;
use crate::application::ports::Clock;
use crate::application::use_cases::OptionLifecycle;
use crate::domain::shared::{Identity, OptionId};
use crate::error::EngineError;

/// Configuration for the expiry keeper.
#[derive(Debug, Clone)]
pub struct ExpiryKeeperConfig {
    /// Time between sweeps.
    pub interval: Duration,
    /// Identity liquidations are submitted as (earns the liquidator share).
    pub identity: Identity,
    /// Router deadline granted to each forced settlement.
    pub settlement_window: Duration,
}

impl Default for ExpiryKeeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            identity: Identity::new("keeper"),
            settlement_window: Duration::from_secs(30),
        }
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeeperSweep {
    /// Expired options found.
    pub attempted: usize,
    /// Options moved to EXPIRED.
    pub liquidated: Vec<OptionId>,
    /// Options that could not be liquidated, with the reason.
    pub failed: Vec<(OptionId, EngineError)>,
}

/// Periodically liquidates expired options.
pub struct ExpiryKeeper {
    lifecycle: Arc<OptionLifecycle>,
    clock: Arc<dyn Clock>,
    config: ExpiryKeeperConfig,
}

impl ExpiryKeeper {
    /// Create a keeper.
    #[must_use]
    pub fn new(lifecycle: Arc<OptionLifecycle>, clock: Arc<dyn Clock>, config: ExpiryKeeperConfig) -> Self {
        Self {
            lifecycle,
            clock,
            config,
        }
    }

    /// Sweep on every tick until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            identity = %self.config.identity,
            "Expiry keeper started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.sweep().await {
                        Ok(sweep) if sweep.attempted > 0 => {
                            tracing::info!(
                                attempted = sweep.attempted,
                                liquidated = sweep.liquidated.len(),
                                failed = sweep.failed.len(),
                                "Expiry sweep finished"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "Expiry sweep failed"),
                    }
                }
                () = shutdown.cancelled() => {
                    tracing::info!("Expiry keeper shutting down");
                    break;
                }
            }
        }
    }

    /// Liquidate every TAKEN option past its deadline once.
    ///
    /// # Errors
    ///
    /// Returns an error only if the option list cannot be read; per-option
    /// failures are collected in the sweep.
    pub async fn sweep(&self) -> Result<KeeperSweep, EngineError> {
        let expired = self.lifecycle.expired_options().await?;
        let mut sweep = KeeperSweep {
            attempted: expired.len(),
            ..KeeperSweep::default()
        };

        for option_id in expired {
            match self.liquidate(option_id).await {
                Ok(()) => sweep.liquidated.push(option_id),
                Err(e) => {
                    tracing::debug!(option_id = %option_id, error = %e, "Keeper liquidation failed");
                    sweep.failed.push((option_id, e));
                }
            }
        }
        Ok(sweep)
    }

    async fn liquidate(&self, option_id: OptionId) -> Result<(), EngineError> {
        let identity = &self.config.identity;
        let plan = self.lifecycle.plan_liquidation(identity, option_id).await?;

        let settlement = plan.swap().map(|_| {
            let window = ChronoDuration::from_std(self.config.settlement_window)
                .unwrap_or_else(|_| ChronoDuration::seconds(30));
            SettlementParams {
                min_return: plan.required_return(),
                deadline: self.clock.now().plus(window),
            }
        });

        self.lifecycle
            .liquidate_expired(
                identity,
                option_id,
                LiquidationParams {
                    settlement,
                    max_price_movement_bps: None,
                },
            )
            .await
            .map(|_| ())
    }
}
