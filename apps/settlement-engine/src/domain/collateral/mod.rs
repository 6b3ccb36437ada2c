//! Collateral Bounded Context
//!
//! Custody balances, take-time reservations, per-position escrow and the
//! per-asset locked totals backing TAKEN options.

mod errors;
mod ledger;

pub use errors::LedgerError;
pub use ledger::{
    CollateralLedger, Credit, Escrow, Holding, LedgerState, PositionSettlement, Reservation,
    SwapRecord,
};
