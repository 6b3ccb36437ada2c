//! Taking a commitment.

use rust_decimal::Decimal;

use super::{OptionLifecycle, check_duration, premium_for};
use crate::application::dto::{TakePublishedRequest, TakeReceipt, TakeRequest};
use crate::application::services::SettlementParams;
use crate::domain::collateral::{Holding, Reservation};
use crate::domain::commitment::{Commitment, CommitmentType, OptionType};
use crate::domain::option_lifecycle::{ActiveOption, OpenOptionCommand};
use crate::domain::settlement::{ReturnCheck, SettlementError, SwapRequirement};
use crate::domain::shared::{Amount, BasisPoints, CommitmentHash, Identity, Price};
use crate::error::EngineError;
use crate::observability::{record_operation_rejected, record_option_taken};

impl OptionLifecycle {
    /// Take a signed commitment, opening a TAKEN option.
    ///
    /// The creator's nonce slot is held from verification until the option
    /// is recorded. Any failure leaves the nonce, balances and option book
    /// unchanged.
    ///
    /// # Errors
    ///
    /// `Paused`, any verifier error, `InvalidCommitment`, `InvalidDuration`,
    /// `Unauthorized` (caller is the creator), `PriceUnavailable`,
    /// `InsufficientCollateral`, `InsufficientFunds`, and for PUT options any
    /// settlement error from the collateral conversion.
    pub async fn take(&self, caller: &Identity, request: TakeRequest) -> Result<TakeReceipt, EngineError> {
        let result = self.take_inner(caller, request).await;
        if let Err(e) = &result {
            tracing::warn!(caller = %caller, code = %e.code(), error = %e, "Take rejected");
            record_operation_rejected("take", e.code().reason());
        }
        result
    }

    /// Take a commitment previously published to the book.
    ///
    /// # Errors
    ///
    /// `CommitmentNotFound`, or any error of [`take`](Self::take).
    pub async fn take_published(
        &self,
        caller: &Identity,
        hash: &CommitmentHash,
        request: TakePublishedRequest,
    ) -> Result<TakeReceipt, EngineError> {
        let signed = self.get_commitment(hash).await?;
        let request = TakeRequest {
            signed,
            duration_days: request.duration_days,
            settlement: request.settlement,
            max_price_movement_bps: request.max_price_movement_bps,
        };
        self.take(caller, request).await
    }

    async fn take_inner(&self, caller: &Identity, request: TakeRequest) -> Result<TakeReceipt, EngineError> {
        if self.parameters.read().paused {
            return Err(EngineError::Paused);
        }

        let TakeRequest {
            signed,
            duration_days,
            settlement,
            max_price_movement_bps,
        } = request;

        let verified = self.verifier.begin(&signed).await?;
        let commitment = &signed.commitment;
        self.validate_shape(commitment)?;
        check_duration(commitment, duration_days)?;

        let (lp, taker) = resolve_roles(commitment, caller)?;
        let strike = self.price_of(&commitment.asset).await?;
        if strike.value() <= Decimal::ZERO {
            return Err(EngineError::PriceUnavailable {
                asset: commitment.asset.clone(),
                message: format!("non-positive price {strike}"),
            });
        }
        let premium = premium_for(commitment, duration_days)?;

        let command = OpenOptionCommand {
            id: self.allocate_option_id(),
            commitment_hash: verified.hash().clone(),
            taker,
            lp,
            asset: commitment.asset.clone(),
            amount: commitment.amount,
            strike_price: strike,
            premium,
            lock_duration_days: duration_days,
            taken_at: self.clock.now(),
            option_type: commitment.option_type,
            commitment_type: commitment.commitment_type,
        };
        let mut option = ActiveOption::open(command)?;
        let option_id = option.id();

        self.ledger.reserve(Reservation {
            option_id,
            lp: option.lp().clone(),
            taker: option.taker().clone(),
            collateral: Holding::new(commitment.asset.clone(), commitment.amount),
            premium: Holding::new(self.quote_asset.clone(), premium),
        })?;

        let escrow = match commitment.option_type {
            OptionType::Call => Holding::new(commitment.asset.clone(), commitment.amount),
            OptionType::Put => {
                let converted = self
                    .convert_put_collateral(commitment, strike, settlement.as_ref(), max_price_movement_bps)
                    .await;
                match converted {
                    Ok(proceeds) => proceeds,
                    Err(e) => {
                        self.ledger.abort(option_id)?;
                        return Err(e);
                    }
                }
            }
        };

        self.record_position(&option, escrow.clone()).await?;

        let hash = verified.consume();
        if let Err(e) = self.commitments.delete(&hash).await {
            tracing::warn!(hash = %hash, error = %e, "Failed to remove taken commitment from the book");
        }

        tracing::info!(
            option_id = %option_id,
            commitment = %hash,
            lp = %option.lp(),
            taker = %option.taker(),
            asset = %option.asset(),
            amount = %option.amount(),
            strike = %strike,
            premium = %premium,
            duration_days,
            "Option taken"
        );
        record_option_taken(
            option.asset(),
            &option.option_type().to_string(),
            &option.commitment_type().to_string(),
        );
        self.report_locked(option.asset());
        self.publish(option.drain_events()).await;

        Ok(TakeReceipt {
            option_id,
            commitment_hash: hash,
            lp: option.lp().clone(),
            taker: option.taker().clone(),
            strike_price: strike,
            premium,
            exercise_deadline: option.exercise_deadline(),
            escrow,
        })
    }

    /// Sell the LP's asset for quote currency at the strike.
    async fn convert_put_collateral(
        &self,
        commitment: &Commitment,
        strike: Price,
        settlement: Option<&SettlementParams>,
        max_price_movement_bps: Option<BasisPoints>,
    ) -> Result<Holding, EngineError> {
        let margin = self.parameters.read().safety_margin;
        let requirement = SwapRequirement::put_collateral_conversion(
            commitment.asset.clone(),
            self.quote_asset.clone(),
            commitment.amount,
            strike,
            margin,
        )?;
        let params = settlement.ok_or(SettlementError::InsufficientReturn {
            check: ReturnCheck::MissingParameters,
            required: requirement.required_out(),
            actual: Amount::ZERO,
        })?;
        let verified = self
            .settlement
            .swap(&requirement, params, max_price_movement_bps)
            .await?;
        tracing::debug!(
            asset = %commitment.asset,
            sold = %commitment.amount,
            proceeds = %verified.actual_out(),
            "PUT collateral converted"
        );
        Ok(verified.proceeds())
    }

    /// Persist the option and commit its reservation under the books lock.
    async fn record_position(&self, option: &ActiveOption, escrow: Holding) -> Result<(), EngineError> {
        let option_id = option.id();
        let _books = self.books.lock().await;

        if let Err(e) = self.options.save(option).await {
            tracing::error!(option_id = %option_id, error = %e, "Failed to persist new option");
            let refund = if escrow.asset == *option.asset() {
                self.ledger.abort(option_id)
            } else {
                self.ledger.abort_converted(option_id, &escrow)
            };
            refund?;
            return Err(e.into());
        }

        self.ledger.commit(option_id, escrow).map_err(|e| {
            tracing::error!(option_id = %option_id, error = %e, "Recorded option has no escrow");
            EngineError::InvariantViolation {
                message: format!("option {option_id} recorded without escrow: {e}"),
            }
        })
    }
}

/// `(lp, taker)` for a commitment taken by `caller`.
fn resolve_roles(commitment: &Commitment, caller: &Identity) -> Result<(Identity, Identity), EngineError> {
    if *caller == commitment.creator {
        return Err(EngineError::Unauthorized {
            message: format!("{caller} cannot take their own commitment"),
        });
    }
    Ok(match commitment.commitment_type {
        CommitmentType::Offer => (commitment.creator.clone(), caller.clone()),
        CommitmentType::Demand => (caller.clone(), commitment.creator.clone()),
    })
}
