//! Shared fixtures: an engine wired to the mock router, a manual clock and
//! Ed25519 keys derived from fixed seeds.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use settlement_engine::application::ports::NoOpEventPublisher;
use settlement_engine::application::services::SettlementParams;
use settlement_engine::domain::collateral::LedgerState;
use settlement_engine::domain::commitment::{AmountBounds, CanonicalEncoder};
use settlement_engine::infrastructure::clock::ManualClock;
use settlement_engine::infrastructure::persistence::{
    InMemoryCommitmentStore, InMemoryOptionRepository,
};
use settlement_engine::infrastructure::router::MockLiquidityRouter;
use settlement_engine::infrastructure::signing::{Ed25519Signer, Ed25519Verifier};
use settlement_engine::{
    Amount, AssetId, BasisPoints, Commitment, CommitmentType, Identity, LifecycleConfig,
    LifecyclePorts, OptionLifecycle, OptionType, ProtocolParameters, SignedCommitment, Timestamp,
};

pub const DEPLOYMENT: &str = "integration-tests";
pub const START_MILLIS: i64 = 1_700_000_000_000;

pub fn weth() -> AssetId {
    AssetId::new("WETH")
}

pub fn usdc() -> AssetId {
    AssetId::new("USDC")
}

pub fn amt(value: Decimal) -> Amount {
    Amount::new(value)
}

pub fn admin() -> Identity {
    Identity::new("admin")
}

pub fn protocol() -> Identity {
    Identity::new("protocol")
}

pub fn lp_signer() -> Ed25519Signer {
    Ed25519Signer::from_seed([1; 32])
}

pub fn taker_signer() -> Ed25519Signer {
    Ed25519Signer::from_seed([2; 32])
}

pub struct Harness {
    pub engine: Arc<OptionLifecycle>,
    pub router: Arc<MockLiquidityRouter>,
    pub clock: Arc<ManualClock>,
    pub encoder: CanonicalEncoder,
    pub lp: Ed25519Signer,
    pub taker: Ed25519Signer,
}

impl Harness {
    /// Engine with WETH at `price` and the default router behaviour.
    pub fn new(price: Decimal) -> Self {
        Self::with_router(MockLiquidityRouter::new().with_price("WETH", price))
    }

    pub fn with_router(router: MockLiquidityRouter) -> Self {
        Self::build(router, LedgerState::default())
    }

    /// Engine with WETH at `price` over pre-seeded ledger books.
    pub fn with_books(price: Decimal, books: LedgerState) -> Self {
        Self::build(MockLiquidityRouter::new().with_price("WETH", price), books)
    }

    fn build(router: MockLiquidityRouter, books: LedgerState) -> Self {
        let router = Arc::new(router);
        let clock = Arc::new(ManualClock::at_millis(START_MILLIS));

        let mut asset_bounds = HashMap::new();
        asset_bounds.insert(
            weth(),
            AmountBounds {
                min_amount: amt(dec!(0.001)),
                max_amount: amt(dec!(1)),
            },
        );
        let config = LifecycleConfig {
            deployment_id: DEPLOYMENT.to_string(),
            quote_asset: usdc(),
            admin: admin(),
            protocol_account: protocol(),
            parameters: ProtocolParameters {
                safety_margin: BasisPoints::new(1),
                liquidator_share: BasisPoints::new(2_500),
                asset_bounds,
                paused: false,
            },
        };
        let ports = LifecyclePorts {
            router: router.clone(),
            oracle: router.clone(),
            signatures: Arc::new(Ed25519Verifier),
            options: Arc::new(InMemoryOptionRepository::new()),
            commitments: Arc::new(InMemoryCommitmentStore::new()),
            events: Arc::new(NoOpEventPublisher),
            clock: clock.clone(),
        };

        Self {
            engine: Arc::new(OptionLifecycle::with_ledger(config, ports, books)),
            router,
            clock,
            encoder: CanonicalEncoder::new(DEPLOYMENT),
            lp: lp_signer(),
            taker: taker_signer(),
        }
    }

    pub fn lp_id(&self) -> Identity {
        self.lp.identity()
    }

    pub fn taker_id(&self) -> Identity {
        self.taker.identity()
    }

    /// LP holds 1 WETH, taker holds 1000 USDC.
    pub fn fund(&self) {
        self.engine.deposit(&self.lp_id(), &weth(), amt(dec!(1))).unwrap();
        self.engine.deposit(&self.taker_id(), &usdc(), amt(dec!(1000))).unwrap();
    }

    /// 0.5 WETH for 1..=7 days at 10 USDC/day, signed by `creator`.
    pub fn commitment(
        &self,
        creator: &Ed25519Signer,
        option_type: OptionType,
        commitment_type: CommitmentType,
        nonce: u64,
    ) -> Commitment {
        Commitment {
            creator: creator.identity(),
            asset: weth(),
            amount: amt(dec!(0.5)),
            premium_rate: amt(dec!(10)),
            min_duration_days: 1,
            max_duration_days: 7,
            option_type,
            commitment_type,
            expiry: self.now().plus(Duration::days(1)),
            nonce,
        }
    }

    pub fn sign(&self, creator: &Ed25519Signer, commitment: Commitment) -> SignedCommitment {
        creator.sign(&self.encoder, commitment)
    }

    /// A signed CALL offer from the LP.
    pub fn call_offer(&self) -> SignedCommitment {
        let commitment = self.commitment(&self.lp, OptionType::Call, CommitmentType::Offer, 0);
        self.sign(&self.lp, commitment)
    }

    /// A signed PUT offer from the LP.
    pub fn put_offer(&self) -> SignedCommitment {
        let commitment = self.commitment(&self.lp, OptionType::Put, CommitmentType::Offer, 0);
        self.sign(&self.lp, commitment)
    }

    pub fn now(&self) -> Timestamp {
        use settlement_engine::application::ports::Clock;
        self.clock.now()
    }

    /// Settlement bounds with a minute to spare.
    pub fn params(&self, min_return: Decimal) -> SettlementParams {
        SettlementParams {
            min_return: amt(min_return),
            deadline: self.now().plus(Duration::minutes(1)),
        }
    }

    pub fn balance(&self, owner: &Identity, asset: &AssetId) -> Amount {
        self.engine.balance(owner, asset)
    }
}
