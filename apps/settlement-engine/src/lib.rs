// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Settlement Engine - Rust Core Library
//!
//! Collateralized, duration-based options built from signed commitments.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic
//!   - `commitment`: Signed OFFER/DEMAND commitments, canonical encoding
//!   - `pricing`: Premium for a chosen duration
//!   - `collateral`: Custody balances, escrow, locked totals
//!   - `option_lifecycle`: `ActiveOption` aggregate, TAKEN → EXERCISED | EXPIRED
//!   - `settlement`: Settlement plans and the router swap protocol
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Router, oracle, signatures, clock, events, commitment book
//!   - `services`: Commitment verifier, settlement engine, expiry keeper
//!   - `use_cases`: `OptionLifecycle`
//!
//! - **Infrastructure**: Adapters
//!   - `http`: axum REST API
//!   - `router`: HTTP liquidity router / price oracle client, mock router
//!   - `persistence`: In-memory option repository and commitment book
//!   - `signing`: Ed25519 signature verifier
//!   - `clock`: System and manual clocks

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Ambient stack
// =============================================================================

/// YAML configuration with environment interpolation.
pub mod config;

/// Engine-level error type and stable error codes.
pub mod error;

/// Prometheus metrics.
pub mod observability;

/// Tracing subscriber and OpenTelemetry setup.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use application::dto::{
    ExerciseRequest, LiquidationParams, OptionDto, SettlementReceipt, TakeReceipt, TakeRequest,
};
pub use application::services::{ExpiryKeeper, ExpiryKeeperConfig, SettlementParams};
pub use application::use_cases::{
    LifecycleConfig, LifecyclePorts, OptionLifecycle, ProtocolParameters,
};
pub use domain::commitment::{Commitment, CommitmentType, OptionType, SignedCommitment};
pub use domain::option_lifecycle::OptionState;
pub use domain::shared::{
    Amount, AssetId, BasisPoints, CommitmentHash, Identity, OptionId, Price, Timestamp,
};
pub use error::{EngineError, ErrorCode};
pub use infrastructure::http::{AppState, create_router};
