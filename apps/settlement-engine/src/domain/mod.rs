//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure dependencies.
//! This layer defines:
//!
//! - **Aggregates**: Consistency boundaries with invariants (`ActiveOption`)
//! - **Value Objects**: Immutable domain types with equality by value
//! - **Domain Events**: Records of option state transitions
//! - **Domain Services**: Stateless business logic (premium, settlement math)
//! - **Repository Traits**: Persistence abstractions (implemented in adapters)
//!
//! # Bounded Contexts
//!
//! - [`commitment`]: Signed OFFER/DEMAND commitments and their canonical encoding
//! - [`pricing`]: Duration premium and yield metrics
//! - [`collateral`]: Custody balances, reservations, escrow and locked totals
//! - [`option_lifecycle`]: The `ActiveOption` aggregate and its state machine
//! - [`settlement`]: Settlement plans and the Quote → Execute → Verify protocol

pub mod collateral;
pub mod commitment;
pub mod option_lifecycle;
pub mod pricing;
pub mod settlement;
pub mod shared;
