//! Option Lifecycle Use Case
//!
//! Creates, exercises and expires positions, orchestrating the commitment
//! verifier, premium calculator, collateral ledger and settlement engine.
//!
//! Ledger changes and the option record they back are applied together
//! under the books lock, so `total_locked(asset)` always equals the summed
//! amount of TAKEN options on that asset when observed through
//! [`OptionLifecycle::check_collateralization`]. Router calls happen
//! outside that lock.

mod settle;
mod take;

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::application::dto::{OptionDto, PremiumQuoteDto};
use crate::application::ports::{
    Clock, CommitmentStorePort, EventPublisherPort, LiquidityRouterPort, PriceOraclePort,
    SignatureVerifier,
};
use crate::application::services::{CommitmentVerifier, SettlementEngine, SingleFlight};
use crate::domain::collateral::{CollateralLedger, Escrow, LedgerState};
use crate::domain::commitment::{AmountBounds, CanonicalEncoder, Commitment, SignedCommitment};
use crate::domain::option_lifecycle::{ActiveOption, OptionEvent, OptionRepository, OptionState};
use crate::domain::pricing::PremiumCalculator;
use crate::domain::shared::{
    Amount, AssetId, BasisPoints, CommitmentHash, Identity, OptionId, Price,
};
use crate::error::EngineError;
use crate::observability::update_locked_collateral;

/// Largest safety margin an admin may set.
pub const MAX_SAFETY_MARGIN_BPS: u32 = 1_000;

/// Parameters an admin may change at runtime.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ProtocolParameters {
    /// Margin retained by the protocol on settlements.
    pub safety_margin: BasisPoints,
    /// Liquidator's share of the margin on forced settlements.
    pub liquidator_share: BasisPoints,
    /// Per-asset amount bands; assets without a band cannot be taken.
    pub asset_bounds: HashMap<AssetId, AmountBounds>,
    /// Whether takes are blocked.
    pub paused: bool,
}

/// Static configuration of the use case.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Bound into every commitment encoding.
    pub deployment_id: String,
    /// Currency premiums, strikes and settlements are quoted in.
    pub quote_asset: AssetId,
    /// Identity allowed to call admin operations.
    pub admin: Identity,
    /// Account credited with protocol revenue.
    pub protocol_account: Identity,
    /// Initial runtime parameters.
    pub parameters: ProtocolParameters,
}

/// Driven adapters the use case depends on.
#[derive(Clone)]
pub struct LifecyclePorts {
    /// External liquidity router.
    pub router: Arc<dyn LiquidityRouterPort>,
    /// Market prices.
    pub oracle: Arc<dyn PriceOraclePort>,
    /// Signature recovery.
    pub signatures: Arc<dyn SignatureVerifier>,
    /// Option records.
    pub options: Arc<dyn OptionRepository>,
    /// Published commitments.
    pub commitments: Arc<dyn CommitmentStorePort>,
    /// Event sink.
    pub events: Arc<dyn EventPublisherPort>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

/// The option lifecycle: take, exercise, liquidate, plus custody, the
/// commitment book, queries and administration.
pub struct OptionLifecycle {
    quote_asset: AssetId,
    admin: Identity,
    protocol_account: Identity,
    parameters: RwLock<ProtocolParameters>,
    verifier: CommitmentVerifier,
    ledger: CollateralLedger,
    settlement: SettlementEngine,
    in_flight: SingleFlight<OptionId>,
    books: tokio::sync::Mutex<()>,
    next_option_id: AtomicU64,
    oracle: Arc<dyn PriceOraclePort>,
    options: Arc<dyn OptionRepository>,
    commitments: Arc<dyn CommitmentStorePort>,
    events: Arc<dyn EventPublisherPort>,
    clock: Arc<dyn Clock>,
}

impl OptionLifecycle {
    /// Create the use case with empty books.
    #[must_use]
    pub fn new(config: LifecycleConfig, ports: LifecyclePorts) -> Self {
        Self::with_ledger(config, ports, LedgerState::default())
    }

    /// Create the use case over existing ledger books.
    #[must_use]
    pub fn with_ledger(config: LifecycleConfig, ports: LifecyclePorts, books: LedgerState) -> Self {
        let verifier = CommitmentVerifier::new(
            CanonicalEncoder::new(config.deployment_id),
            ports.signatures,
            Arc::clone(&ports.clock),
        );
        Self {
            quote_asset: config.quote_asset,
            admin: config.admin,
            protocol_account: config.protocol_account,
            parameters: RwLock::new(config.parameters),
            verifier,
            ledger: CollateralLedger::with_state(books),
            settlement: SettlementEngine::new(ports.router, Arc::clone(&ports.clock)),
            in_flight: SingleFlight::new(),
            books: tokio::sync::Mutex::new(()),
            next_option_id: AtomicU64::new(1),
            oracle: ports.oracle,
            options: ports.options,
            commitments: ports.commitments,
            events: ports.events,
            clock: ports.clock,
        }
    }

    /// Quote currency.
    #[must_use]
    pub const fn quote_asset(&self) -> &AssetId {
        &self.quote_asset
    }

    /// Protocol revenue account.
    #[must_use]
    pub const fn protocol_account(&self) -> &Identity {
        &self.protocol_account
    }

    // ========================================================================
    // Administration
    // ========================================================================

    fn require_admin(&self, caller: &Identity) -> Result<(), EngineError> {
        if *caller == self.admin {
            Ok(())
        } else {
            Err(EngineError::Unauthorized {
                message: format!("{caller} is not the admin"),
            })
        }
    }

    /// Current runtime parameters.
    #[must_use]
    pub fn parameters(&self) -> ProtocolParameters {
        self.parameters.read().clone()
    }

    /// Block new takes. Exercise and liquidation stay available.
    ///
    /// # Errors
    ///
    /// `Unauthorized` if `caller` is not the admin.
    pub fn pause(&self, caller: &Identity) -> Result<(), EngineError> {
        self.require_admin(caller)?;
        self.parameters.write().paused = true;
        tracing::warn!(admin = %caller, "Takes paused");
        Ok(())
    }

    /// Allow takes again.
    ///
    /// # Errors
    ///
    /// `Unauthorized` if `caller` is not the admin.
    pub fn unpause(&self, caller: &Identity) -> Result<(), EngineError> {
        self.require_admin(caller)?;
        self.parameters.write().paused = false;
        tracing::info!(admin = %caller, "Takes unpaused");
        Ok(())
    }

    /// Set the settlement safety margin.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, or `InvalidConfiguration` above
    /// [`MAX_SAFETY_MARGIN_BPS`].
    pub fn set_safety_margin(&self, caller: &Identity, margin: BasisPoints) -> Result<(), EngineError> {
        self.require_admin(caller)?;
        if margin.value() > MAX_SAFETY_MARGIN_BPS {
            return Err(EngineError::InvalidConfiguration {
                message: format!("safety margin {margin} exceeds {MAX_SAFETY_MARGIN_BPS}bps"),
            });
        }
        self.parameters.write().safety_margin = margin;
        tracing::info!(admin = %caller, margin = %margin, "Safety margin updated");
        Ok(())
    }

    /// Set the amount band for an asset.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, or `InvalidConfiguration` if the band is empty or
    /// not positive.
    pub fn set_asset_bounds(
        &self,
        caller: &Identity,
        asset: AssetId,
        bounds: AmountBounds,
    ) -> Result<(), EngineError> {
        self.require_admin(caller)?;
        if !bounds.min_amount.is_positive() || bounds.min_amount > bounds.max_amount {
            return Err(EngineError::InvalidConfiguration {
                message: format!(
                    "invalid bounds for {asset}: [{}, {}]",
                    bounds.min_amount, bounds.max_amount
                ),
            });
        }
        tracing::info!(
            admin = %caller,
            asset = %asset,
            min = %bounds.min_amount,
            max = %bounds.max_amount,
            "Asset bounds updated"
        );
        self.parameters.write().asset_bounds.insert(asset, bounds);
        Ok(())
    }

    // ========================================================================
    // Custody
    // ========================================================================

    /// Credit `owner`'s free balance.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` for a non-positive amount, `AmountOutOfRange` if
    /// the balance would overflow.
    pub fn deposit(&self, owner: &Identity, asset: &AssetId, amount: Amount) -> Result<Amount, EngineError> {
        self.ledger.deposit(owner, asset, amount)?;
        tracing::info!(owner = %owner, asset = %asset, amount = %amount, "Deposit");
        Ok(self.ledger.balance(owner, asset))
    }

    /// Debit `owner`'s free balance.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` if the free balance cannot cover `amount`.
    pub fn withdraw(&self, owner: &Identity, asset: &AssetId, amount: Amount) -> Result<Amount, EngineError> {
        self.ledger.withdraw(owner, asset, amount)?;
        tracing::info!(owner = %owner, asset = %asset, amount = %amount, "Withdrawal");
        Ok(self.ledger.balance(owner, asset))
    }

    /// Free balance.
    #[must_use]
    pub fn balance(&self, owner: &Identity, asset: &AssetId) -> Amount {
        self.ledger.balance(owner, asset)
    }

    /// Revenue accrued to the protocol account in `asset`.
    #[must_use]
    pub fn protocol_revenue(&self, asset: &AssetId) -> Amount {
        self.ledger.balance(&self.protocol_account, asset)
    }

    /// Locked underlying notional for `asset`.
    #[must_use]
    pub fn total_locked(&self, asset: &AssetId) -> Amount {
        self.ledger.total_locked(asset)
    }

    /// Escrow backing an option.
    #[must_use]
    pub fn escrow(&self, option_id: OptionId) -> Option<Escrow> {
        self.ledger.escrow(option_id)
    }

    // ========================================================================
    // Commitment book
    // ========================================================================

    /// Publish a signed commitment to the book.
    ///
    /// The signature and shape are checked; the nonce is not consumed.
    ///
    /// # Errors
    ///
    /// `CommitmentExpired`, `InvalidSignature`, `InvalidCommitment`, or
    /// `NonceMismatch` for an already-consumed nonce.
    pub async fn publish_commitment(&self, signed: SignedCommitment) -> Result<CommitmentHash, EngineError> {
        let hash = self.verifier.verify_signature(&signed)?;
        self.validate_shape(&signed.commitment)?;

        let commitment = &signed.commitment;
        let current = self.verifier.nonce_of(&commitment.creator).await;
        if commitment.nonce < current {
            return Err(EngineError::NonceMismatch {
                creator: commitment.creator.clone(),
                expected: current,
                actual: commitment.nonce,
            });
        }

        self.commitments
            .put(hash.clone(), signed)
            .await
            .map_err(|e| EngineError::Persistence {
                message: e.to_string(),
            })?;
        tracing::info!(hash = %hash, "Commitment published");
        Ok(hash)
    }

    /// A published commitment.
    ///
    /// # Errors
    ///
    /// `CommitmentNotFound` or `Persistence`.
    pub async fn get_commitment(&self, hash: &CommitmentHash) -> Result<SignedCommitment, EngineError> {
        self.commitments
            .get(hash)
            .await
            .map_err(|e| EngineError::Persistence {
                message: e.to_string(),
            })?
            .ok_or_else(|| EngineError::CommitmentNotFound { hash: hash.clone() })
    }

    /// All published, unconsumed commitments.
    ///
    /// # Errors
    ///
    /// `Persistence` if the store fails.
    pub async fn list_commitments(&self) -> Result<Vec<(CommitmentHash, SignedCommitment)>, EngineError> {
        self.commitments.list().await.map_err(|e| EngineError::Persistence {
            message: e.to_string(),
        })
    }

    /// Current nonce of a creator.
    pub async fn nonce_of(&self, creator: &Identity) -> u64 {
        self.verifier.nonce_of(creator).await
    }

    /// Premium and yield for taking `commitment` for `duration_days` now.
    ///
    /// # Errors
    ///
    /// `InvalidCommitment`, `InvalidDuration`, `PriceUnavailable`, or
    /// `AmountOutOfRange` if the premium cannot be represented.
    pub async fn quote_premium(
        &self,
        commitment: &Commitment,
        duration_days: u16,
    ) -> Result<PremiumQuoteDto, EngineError> {
        self.validate_shape(commitment)?;
        check_duration(commitment, duration_days)?;
        let premium = premium_for(commitment, duration_days)?;
        let price = self.price_of(&commitment.asset).await?;
        let metrics = PremiumCalculator::yield_metrics(commitment, duration_days, price);
        Ok(PremiumQuoteDto {
            premium,
            price,
            daily_yield_bps: metrics.map(|m| m.daily_yield_bps),
            annualized_yield_bps: metrics.map(|m| m.annualized_yield_bps),
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// An option by id.
    ///
    /// # Errors
    ///
    /// `OptionNotFound` or `Persistence`.
    pub async fn get_option(&self, option_id: OptionId) -> Result<OptionDto, EngineError> {
        self.load_option(option_id).await.map(|o| OptionDto::from_option(&o))
    }

    /// Options, optionally filtered by state, ordered by id.
    ///
    /// # Errors
    ///
    /// `Persistence` if the repository fails.
    pub async fn list_options(&self, state: Option<OptionState>) -> Result<Vec<OptionDto>, EngineError> {
        let mut options = match state {
            Some(state) => self.options.find_by_state(state).await?,
            None => self.options.find_all().await?,
        };
        options.sort_by_key(ActiveOption::id);
        Ok(options.iter().map(OptionDto::from_option).collect())
    }

    /// TAKEN options whose deadline has passed.
    ///
    /// # Errors
    ///
    /// `Persistence` if the repository fails.
    pub async fn expired_options(&self) -> Result<Vec<OptionId>, EngineError> {
        let now = self.clock.now();
        let mut ids: Vec<OptionId> = self
            .options
            .find_by_state(OptionState::Taken)
            .await?
            .into_iter()
            .filter(|o| o.is_past_deadline(now))
            .map(|o| o.id())
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Check `total_locked(asset)` against the TAKEN options on `asset`.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` on mismatch, `Persistence` if the repository fails.
    pub async fn check_collateralization(&self, asset: &AssetId) -> Result<Amount, EngineError> {
        let _books = self.books.lock().await;
        let taken = self.options.find_by_asset(asset).await?;
        let expected = Amount::checked_sum(
            taken
                .iter()
                .filter(|o| o.state() == OptionState::Taken)
                .map(ActiveOption::amount),
        )
        .ok_or_else(|| EngineError::InvariantViolation {
            message: format!("{asset}: TAKEN options total overflows"),
        })?;
        let locked = self.ledger.total_locked(asset);
        if locked != expected {
            tracing::error!(
                asset = %asset,
                locked = %locked,
                expected = %expected,
                "Collateralization invariant violated"
            );
            return Err(EngineError::InvariantViolation {
                message: format!("{asset}: locked {locked}, TAKEN options total {expected}"),
            });
        }
        Ok(locked)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn validate_shape(&self, commitment: &Commitment) -> Result<(), EngineError> {
        let parameters = self.parameters.read();
        commitment.validate_shape(parameters.asset_bounds.get(&commitment.asset))?;
        Ok(())
    }

    async fn price_of(&self, asset: &AssetId) -> Result<Price, EngineError> {
        self.oracle
            .price(asset)
            .await
            .map_err(|e| EngineError::PriceUnavailable {
                asset: asset.clone(),
                message: e.to_string(),
            })
    }

    async fn load_option(&self, option_id: OptionId) -> Result<ActiveOption, EngineError> {
        self.options
            .find_by_id(option_id)
            .await?
            .ok_or(EngineError::OptionNotFound { option_id })
    }

    fn allocate_option_id(&self) -> OptionId {
        OptionId::new(self.next_option_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn publish(&self, events: Vec<OptionEvent>) {
        if events.is_empty() {
            return;
        }
        if let Err(e) = self.events.publish_option_events(events).await {
            tracing::error!(error = %e, "Failed to publish option events");
        }
    }

    fn report_locked(&self, asset: &AssetId) {
        update_locked_collateral(asset, self.ledger.total_locked(asset));
    }
}

fn check_duration(commitment: &Commitment, duration_days: u16) -> Result<(), EngineError> {
    if PremiumCalculator::is_valid_duration(commitment, duration_days) {
        Ok(())
    } else {
        Err(EngineError::InvalidDuration {
            requested: duration_days,
            min: commitment.min_duration_days,
            max: commitment.max_duration_days,
        })
    }
}

fn premium_for(commitment: &Commitment, duration_days: u16) -> Result<Amount, EngineError> {
    PremiumCalculator::premium_for(commitment, duration_days).ok_or_else(|| EngineError::AmountOutOfRange {
        message: format!(
            "premium at rate {} over {duration_days} days",
            commitment.premium_rate
        ),
    })
}
