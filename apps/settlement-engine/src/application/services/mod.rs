//! Application Services
//!
//! Stateful collaborators of the `OptionLifecycle` use case, and the
//! background expiry keeper.

mod commitment_verifier;
mod expiry_keeper;
mod settlement_engine;
mod single_flight;

pub use commitment_verifier::{CommitmentVerifier, NonceTable, VerifiedCommitment};
pub use expiry_keeper::{ExpiryKeeper, ExpiryKeeperConfig, KeeperSweep};
pub use settlement_engine::{SettlementEngine, SettlementParams};
pub use single_flight::{FlightGuard, SingleFlight};
