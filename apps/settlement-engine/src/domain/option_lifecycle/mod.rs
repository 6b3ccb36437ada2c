//! Option Lifecycle Bounded Context
//!
//! The `ActiveOption` aggregate created when a commitment is taken, and the
//! state machine it moves through:
//!
//! ```text
//! TAKEN ──exercise──▶ EXERCISED
//!   │
//!   └──liquidate_expired──▶ EXPIRED
//! ```
//!
//! Absence of a record means the option was never taken; no `NONE` state is
//! persisted.

pub mod aggregate;
pub mod errors;
pub mod events;
pub mod repository;
pub mod state;

pub use aggregate::{ActiveOption, OpenOptionCommand};
pub use errors::OptionError;
pub use events::{ExpiryBranch, OptionEvent, OptionExercised, OptionExpired, OptionTaken};
pub use repository::OptionRepository;
pub use state::{OptionState, OptionStateMachine};
