//! Commitment Bounded Context
//!
//! Off-chain authored, signed declarations of intent to trade an option:
//! the data model, its shape invariants and its canonical encoding.

pub mod encoding;
pub mod errors;
pub mod model;

pub use encoding::{COMMITMENT_DOMAIN_TAG, COMMITMENT_ENCODING_VERSION, CanonicalEncoder};
pub use errors::CommitmentError;
pub use model::{
    AmountBounds, Commitment, CommitmentType, MAX_DURATION_DAYS, MAX_PREMIUM_RATE, MIN_DURATION_DAYS,
    OptionType, Signature, SignedCommitment,
};
