//! ActiveOption Aggregate Root
//!
//! The position materialized when a commitment is taken. The aggregate
//! enforces its own state machine; collateral and settlement math live in
//! their own contexts.

use serde::{Deserialize, Serialize};

use super::errors::OptionError;
use super::events::{ExpiryBranch, OptionEvent, OptionExercised, OptionExpired, OptionTaken};
use super::state::{OptionState, OptionStateMachine};
use crate::domain::collateral::Credit;
use crate::domain::commitment::{CommitmentType, OptionType};
use crate::domain::shared::{
    Amount, AssetId, CommitmentHash, Identity, OptionId, Price, Timestamp,
};

/// Command to open a new position.
#[derive(Debug, Clone)]
pub struct OpenOptionCommand {
    /// Allocated option id.
    pub id: OptionId,
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
    /// Market price at take time.
    pub strike_price: Price,
    /// Premium paid to the LP.
    pub premium: Amount,
    /// Chosen lock duration.
    pub lock_duration_days: u16,
    /// Take instant.
    pub taken_at: Timestamp,
    /// CALL or PUT.
    pub option_type: OptionType,
    /// OFFER or DEMAND.
    pub commitment_type: CommitmentType,
}

impl OpenOptionCommand {
    /// Validate the command parameters.
    ///
    /// # Errors
    ///
    /// Returns error if a parameter is missing or invalid.
    pub fn validate(&self) -> Result<(), OptionError> {
        if self.taker == self.lp {
            return Err(OptionError::InvalidParameters {
                field: "taker".to_string(),
                message: "taker and lp must be different parties".to_string(),
            });
        }
        self.amount
            .validate_positive("amount")
            .map_err(|e| OptionError::InvalidParameters {
                field: "amount".to_string(),
                message: e.to_string(),
            })?;
        Price::positive(self.strike_price.value()).map_err(|e| {
            OptionError::InvalidParameters {
                field: "strike_price".to_string(),
                message: e.to_string(),
            }
        })?;
        if self.lock_duration_days == 0 {
            return Err(OptionError::InvalidParameters {
                field: "lock_duration_days".to_string(),
                message: "must be at least one day".to_string(),
            });
        }
        Ok(())
    }
}

/// ActiveOption Aggregate Root.
#[allow(clippy::struct_field_names)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveOption {
    id: OptionId,
    commitment_hash: CommitmentHash,
    taker: Identity,
    lp: Identity,
    asset: AssetId,
    amount: Amount,
    strike_price: Price,
    total_premium_paid: Amount,
    lock_duration_days: u16,
    taken_at: Timestamp,
    exercise_deadline: Timestamp,
    option_type: OptionType,
    commitment_type: CommitmentType,
    state: OptionState,
    settled_at: Option<Timestamp>,
    #[serde(skip)]
    events: Vec<OptionEvent>,
}

impl ActiveOption {
    /// Open a position in the TAKEN state.
    ///
    /// Generates an `OptionTaken` event.
    ///
    /// # Errors
    ///
    /// Returns error if command validation fails.
    pub fn open(cmd: OpenOptionCommand) -> Result<Self, OptionError> {
        cmd.validate()?;

        let exercise_deadline = cmd.taken_at.plus_days(cmd.lock_duration_days);
        let mut option = Self {
            id: cmd.id,
            commitment_hash: cmd.commitment_hash,
            taker: cmd.taker,
            lp: cmd.lp,
            asset: cmd.asset,
            amount: cmd.amount,
            strike_price: cmd.strike_price,
            total_premium_paid: cmd.premium,
            lock_duration_days: cmd.lock_duration_days,
            taken_at: cmd.taken_at,
            exercise_deadline,
            option_type: cmd.option_type,
            commitment_type: cmd.commitment_type,
            state: OptionState::Taken,
            settled_at: None,
            events: Vec::new(),
        };

        option.events.push(OptionEvent::Taken(OptionTaken {
            option_id: option.id,
            commitment_hash: option.commitment_hash.clone(),
            taker: option.taker.clone(),
            lp: option.lp.clone(),
            asset: option.asset.clone(),
            amount: option.amount,
            strike_price: option.strike_price,
            premium: option.total_premium_paid,
            option_type: option.option_type,
            commitment_type: option.commitment_type,
            exercise_deadline,
            occurred_at: option.taken_at,
        }));

        Ok(option)
    }

    // Getters

    /// Option id.
    #[must_use]
    pub const fn id(&self) -> OptionId {
        self.id
    }

    /// Hash of the originating commitment.
    #[must_use]
    pub const fn commitment_hash(&self) -> &CommitmentHash {
        &self.commitment_hash
    }

    /// Premium payer and exercise holder.
    #[must_use]
    pub const fn taker(&self) -> &Identity {
        &self.taker
    }

    /// Collateral provider.
    #[must_use]
    pub const fn lp(&self) -> &Identity {
        &self.lp
    }

    /// Underlying asset.
    #[must_use]
    pub const fn asset(&self) -> &AssetId {
        &self.asset
    }

    /// Underlying quantity.
    #[must_use]
    pub const fn amount(&self) -> Amount {
        self.amount
    }

    /// Strike locked at take time.
    #[must_use]
    pub const fn strike_price(&self) -> Price {
        self.strike_price
    }

    /// Premium the taker paid.
    #[must_use]
    pub const fn total_premium_paid(&self) -> Amount {
        self.total_premium_paid
    }

    /// Chosen lock duration in days.
    #[must_use]
    pub const fn lock_duration_days(&self) -> u16 {
        self.lock_duration_days
    }

    /// Take instant.
    #[must_use]
    pub const fn taken_at(&self) -> Timestamp {
        self.taken_at
    }

    /// Last instant the taker may exercise.
    #[must_use]
    pub const fn exercise_deadline(&self) -> Timestamp {
        self.exercise_deadline
    }

    /// CALL or PUT.
    #[must_use]
    pub const fn option_type(&self) -> OptionType {
        self.option_type
    }

    /// OFFER or DEMAND.
    #[must_use]
    pub const fn commitment_type(&self) -> CommitmentType {
        self.commitment_type
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> OptionState {
        self.state
    }

    /// When the option reached a terminal state.
    #[must_use]
    pub const fn settled_at(&self) -> Option<Timestamp> {
        self.settled_at
    }

    // Queries

    /// Whether the taker may exercise at `now`.
    #[must_use]
    pub fn is_exercisable_at(&self, now: Timestamp) -> bool {
        self.state == OptionState::Taken && now <= self.exercise_deadline
    }

    /// Whether `now` is strictly past the exercise deadline.
    #[must_use]
    pub fn is_past_deadline(&self, now: Timestamp) -> bool {
        now > self.exercise_deadline
    }

    /// Whether the taker is in the money at `price`.
    #[must_use]
    pub fn is_profitable_at(&self, price: Price) -> bool {
        self.option_type.is_profitable(self.strike_price, price)
    }

    // Commands

    /// Transition TAKEN → EXERCISED after a verified settlement.
    ///
    /// # Errors
    ///
    /// Returns error if the option is not TAKEN.
    pub fn mark_exercised(
        &mut self,
        settlement_price: Price,
        payouts: Vec<Credit>,
        at: Timestamp,
    ) -> Result<(), OptionError> {
        OptionStateMachine::validate_transition(self.state, OptionState::Exercised)?;
        self.state = OptionState::Exercised;
        self.settled_at = Some(at);

        self.events.push(OptionEvent::Exercised(OptionExercised {
            option_id: self.id,
            taker: self.taker.clone(),
            settlement_price,
            payouts,
            occurred_at: at,
        }));
        Ok(())
    }

    /// Transition TAKEN → EXPIRED once the escrow has been released.
    ///
    /// # Errors
    ///
    /// Returns error if the option is not TAKEN.
    pub fn mark_expired(
        &mut self,
        liquidator: Identity,
        branch: ExpiryBranch,
        settlement_price: Price,
        payouts: Vec<Credit>,
        at: Timestamp,
    ) -> Result<(), OptionError> {
        OptionStateMachine::validate_transition(self.state, OptionState::Expired)?;
        self.state = OptionState::Expired;
        self.settled_at = Some(at);

        self.events.push(OptionEvent::Expired(OptionExpired {
            option_id: self.id,
            liquidator,
            branch,
            settlement_price,
            payouts,
            occurred_at: at,
        }));
        Ok(())
    }

    /// Take all pending domain events.
    pub fn drain_events(&mut self) -> Vec<OptionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Pending domain events.
    #[must_use]
    pub fn pending_events(&self) -> &[OptionEvent] {
        &self.events
    }
}
