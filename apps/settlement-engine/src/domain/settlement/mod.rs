//! Settlement Bounded Context
//!
//! Settlement math for exercised and expired options, and the typed
//! protocol every router interaction goes through:
//!
//! ```text
//! SwapRequirement ──validate_quote──▶ ValidatedQuote
//!                                        │ record_execution(actual_out)
//!                                        ▼
//!                  VerifiedSwap ◀──verify── ExecutedSwap
//! ```
//!
//! Only a [`VerifiedSwap`] can be turned into ledger credits, so proceeds
//! are never distributed before the received amount has been checked.

mod errors;
mod plan;
mod protocol;

pub use errors::{ReturnCheck, SettlementError};
pub use plan::{LiquidatorShare, SettlementPlan, SettlementTerms};
pub use protocol::{
    ExecutedSwap, RouteQuote, SwapDirection, SwapRequirement, ValidatedQuote, VerifiedSwap,
};
