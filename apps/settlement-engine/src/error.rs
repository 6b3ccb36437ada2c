//! Engine errors.
//!
//! Every public operation fails with a typed [`EngineError`]. Each variant
//! maps to a stable [`ErrorCode`] reason string and an HTTP status.
//!
//! | Status | Codes |
//! |--------|-------|
//! | 400 | `INVALID_COMMITMENT`, `INVALID_DURATION`, `INVALID_REQUEST`, `INVALID_CONFIGURATION` |
//! | 401 | `INVALID_SIGNATURE` |
//! | 403 | `UNAUTHORIZED` |
//! | 404 | `OPTION_NOT_FOUND`, `COMMITMENT_NOT_FOUND` |
//! | 409 | `NONCE_MISMATCH`, `SETTLEMENT_IN_FLIGHT`, `NOT_EXERCISABLE` |
//! | 410 | `COMMITMENT_EXPIRED` |
//! | 422 | `INSUFFICIENT_COLLATERAL`, `INSUFFICIENT_FUNDS`, `INSUFFICIENT_RETURN`, `EXCESSIVE_PRICE_MOVEMENT`, `AMOUNT_OUT_OF_RANGE` |
//! | 502 | `EXTERNAL_ROUTER_FAILURE`, `PRICE_UNAVAILABLE` |
//! | 503 | `PAUSED` |
//! | 500 | `PERSISTENCE_ERROR`, `INVARIANT_VIOLATION` |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::collateral::LedgerError;
use crate::domain::commitment::CommitmentError;
use crate::domain::option_lifecycle::OptionError;
use crate::domain::settlement::SettlementError;
use crate::domain::shared::{Amount, AssetId, CommitmentHash, Identity, OptionId, Timestamp};

/// Stable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Signature does not recover to the commitment's creator.
    InvalidSignature,
    /// Commitment is past its expiry.
    CommitmentExpired,
    /// Commitment nonce is not the creator's current nonce.
    NonceMismatch,
    /// Duration outside the commitment's range.
    InvalidDuration,
    /// LP cannot cover the collateral.
    InsufficientCollateral,
    /// Settlement proceeds below the required minimum.
    InsufficientReturn,
    /// Wrong state, outside the exercise window, or not profitable.
    NotExercisable,
    /// Caller may not perform the operation.
    Unauthorized,
    /// Another settlement for the option is running.
    SettlementInFlight,
    /// Router failed, timed out or returned garbage.
    ExternalRouterFailure,
    /// Commitment shape invariants violated.
    InvalidCommitment,
    /// Free balance cannot cover a debit.
    InsufficientFunds,
    /// Router quote too far from the oracle price.
    ExcessivePriceMovement,
    /// An amount or balance would exceed the representable range.
    AmountOutOfRange,
    /// Oracle could not price the asset.
    PriceUnavailable,
    /// No such option.
    OptionNotFound,
    /// No such published commitment.
    CommitmentNotFound,
    /// Takes are paused.
    Paused,
    /// Malformed request.
    InvalidRequest,
    /// Bad configuration or admin parameter.
    InvalidConfiguration,
    /// Storage failure.
    PersistenceError,
    /// Internal consistency check failed.
    InvariantViolation,
}

impl ErrorCode {
    /// HTTP status for this code.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidCommitment
            | Self::InvalidDuration
            | Self::InvalidRequest
            | Self::InvalidConfiguration => 400,
            Self::InvalidSignature => 401,
            Self::Unauthorized => 403,
            Self::OptionNotFound | Self::CommitmentNotFound => 404,
            Self::NonceMismatch | Self::SettlementInFlight | Self::NotExercisable => 409,
            Self::CommitmentExpired => 410,
            Self::InsufficientCollateral
            | Self::InsufficientFunds
            | Self::InsufficientReturn
            | Self::ExcessivePriceMovement
            | Self::AmountOutOfRange => 422,
            Self::ExternalRouterFailure | Self::PriceUnavailable => 502,
            Self::Paused => 503,
            Self::PersistenceError | Self::InvariantViolation => 500,
        }
    }

    /// Reason string.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::CommitmentExpired => "COMMITMENT_EXPIRED",
            Self::NonceMismatch => "NONCE_MISMATCH",
            Self::InvalidDuration => "INVALID_DURATION",
            Self::InsufficientCollateral => "INSUFFICIENT_COLLATERAL",
            Self::InsufficientReturn => "INSUFFICIENT_RETURN",
            Self::NotExercisable => "NOT_EXERCISABLE",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::SettlementInFlight => "SETTLEMENT_IN_FLIGHT",
            Self::ExternalRouterFailure => "EXTERNAL_ROUTER_FAILURE",
            Self::InvalidCommitment => "INVALID_COMMITMENT",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::ExcessivePriceMovement => "EXCESSIVE_PRICE_MOVEMENT",
            Self::AmountOutOfRange => "AMOUNT_OUT_OF_RANGE",
            Self::PriceUnavailable => "PRICE_UNAVAILABLE",
            Self::OptionNotFound => "OPTION_NOT_FOUND",
            Self::CommitmentNotFound => "COMMITMENT_NOT_FOUND",
            Self::Paused => "PAUSED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::InvalidConfiguration => "INVALID_CONFIGURATION",
            Self::PersistenceError => "PERSISTENCE_ERROR",
            Self::InvariantViolation => "INVARIANT_VIOLATION",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// Failure of an engine operation. Validation failures leave all state
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Signature malformed or recovered to someone other than the creator.
    #[error("Invalid signature: {message}")]
    InvalidSignature {
        /// Details.
        message: String,
    },

    /// Commitment can no longer be taken.
    #[error("Commitment expired at {expiry} (now {now})")]
    CommitmentExpired {
        /// Commitment expiry.
        expiry: Timestamp,
        /// Evaluation time.
        now: Timestamp,
    },

    /// Commitment nonce is stale or from the future.
    #[error("Nonce mismatch for {creator}: expected {expected}, got {actual}")]
    NonceMismatch {
        /// Commitment creator.
        creator: Identity,
        /// Creator's current nonce.
        expected: u64,
        /// Nonce in the commitment.
        actual: u64,
    },

    /// Requested duration outside the commitment's range.
    #[error("Invalid duration {requested}d, allowed {min}..={max}d")]
    InvalidDuration {
        /// Requested days.
        requested: u16,
        /// Commitment minimum.
        min: u16,
        /// Commitment maximum.
        max: u16,
    },

    /// LP cannot lock the collateral.
    #[error("Insufficient collateral: {message}")]
    InsufficientCollateral {
        /// Details.
        message: String,
    },

    /// Proceeds fell short of the required minimum.
    #[error("Insufficient return at {check}: required {required}, got {actual}")]
    InsufficientReturn {
        /// Which check failed.
        check: String,
        /// Threshold.
        required: Amount,
        /// Offered, quoted or received.
        actual: Amount,
    },

    /// Option cannot be exercised or liquidated now.
    #[error("Option {option_id} not exercisable: {reason}")]
    NotExercisable {
        /// Option id.
        option_id: OptionId,
        /// Why.
        reason: String,
    },

    /// Caller may not perform the operation.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Details.
        message: String,
    },

    /// Another settlement for the option is running.
    #[error("Settlement already in flight for option {option_id}")]
    SettlementInFlight {
        /// Option id.
        option_id: OptionId,
    },

    /// Router failed, timed out or the settlement deadline passed.
    #[error("External router failure: {message}")]
    ExternalRouterFailure {
        /// Details.
        message: String,
    },

    /// Commitment violates its shape invariants.
    #[error("Invalid commitment: {message}")]
    InvalidCommitment {
        /// Details.
        message: String,
    },

    /// A free balance cannot cover a debit.
    #[error("Insufficient funds: {message}")]
    InsufficientFunds {
        /// Details.
        message: String,
    },

    /// Router quote deviates too far from the oracle.
    #[error("Excessive price movement: {message}")]
    ExcessivePriceMovement {
        /// Details.
        message: String,
    },

    /// An amount or balance would exceed the representable range.
    #[error("Amount out of range: {message}")]
    AmountOutOfRange {
        /// Details.
        message: String,
    },

    /// Oracle could not price the asset.
    #[error("Price unavailable for {asset}: {message}")]
    PriceUnavailable {
        /// Asset.
        asset: AssetId,
        /// Details.
        message: String,
    },

    /// No such option.
    #[error("Option not found: {option_id}")]
    OptionNotFound {
        /// Option id.
        option_id: OptionId,
    },

    /// No such published commitment.
    #[error("Commitment not found: {hash}")]
    CommitmentNotFound {
        /// Commitment hash.
        hash: CommitmentHash,
    },

    /// Takes are paused.
    #[error("Engine is paused")]
    Paused,

    /// Malformed request.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Details.
        message: String,
    },

    /// Bad configuration or admin parameter.
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Details.
        message: String,
    },

    /// Storage failure.
    #[error("Persistence error: {message}")]
    Persistence {
        /// Details.
        message: String,
    },

    /// Internal consistency check failed.
    #[error("Invariant violation: {message}")]
    InvariantViolation {
        /// Details.
        message: String,
    },
}

impl EngineError {
    /// Stable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidSignature { .. } => ErrorCode::InvalidSignature,
            Self::CommitmentExpired { .. } => ErrorCode::CommitmentExpired,
            Self::NonceMismatch { .. } => ErrorCode::NonceMismatch,
            Self::InvalidDuration { .. } => ErrorCode::InvalidDuration,
            Self::InsufficientCollateral { .. } => ErrorCode::InsufficientCollateral,
            Self::InsufficientReturn { .. } => ErrorCode::InsufficientReturn,
            Self::NotExercisable { .. } => ErrorCode::NotExercisable,
            Self::Unauthorized { .. } => ErrorCode::Unauthorized,
            Self::SettlementInFlight { .. } => ErrorCode::SettlementInFlight,
            Self::ExternalRouterFailure { .. } => ErrorCode::ExternalRouterFailure,
            Self::InvalidCommitment { .. } => ErrorCode::InvalidCommitment,
            Self::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            Self::ExcessivePriceMovement { .. } => ErrorCode::ExcessivePriceMovement,
            Self::AmountOutOfRange { .. } => ErrorCode::AmountOutOfRange,
            Self::PriceUnavailable { .. } => ErrorCode::PriceUnavailable,
            Self::OptionNotFound { .. } => ErrorCode::OptionNotFound,
            Self::CommitmentNotFound { .. } => ErrorCode::CommitmentNotFound,
            Self::Paused => ErrorCode::Paused,
            Self::InvalidRequest { .. } => ErrorCode::InvalidRequest,
            Self::InvalidConfiguration { .. } => ErrorCode::InvalidConfiguration,
            Self::Persistence { .. } => ErrorCode::PersistenceError,
            Self::InvariantViolation { .. } => ErrorCode::InvariantViolation,
        }
    }

    /// Shorthand for [`EngineError::NotExercisable`].
    pub fn not_exercisable(option_id: OptionId, reason: impl Into<String>) -> Self {
        Self::NotExercisable {
            option_id,
            reason: reason.into(),
        }
    }
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientCollateral { .. } => Self::InsufficientCollateral {
                message: err.to_string(),
            },
            LedgerError::InsufficientBalance { .. } | LedgerError::NonPositiveAmount { .. } => {
                Self::InsufficientFunds {
                    message: err.to_string(),
                }
            }
            LedgerError::Overflow { .. } => Self::AmountOutOfRange {
                message: err.to_string(),
            },
            LedgerError::UnknownPosition { .. }
            | LedgerError::DuplicatePosition { .. }
            | LedgerError::ConservationViolated { .. }
            | LedgerError::EscrowMismatch { .. } => Self::InvariantViolation {
                message: err.to_string(),
            },
        }
    }
}

impl From<SettlementError> for EngineError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::InsufficientReturn {
                check,
                required,
                actual,
            } => Self::InsufficientReturn {
                check: check.as_str().to_string(),
                required,
                actual,
            },
            SettlementError::ExcessivePriceMovement { .. } => Self::ExcessivePriceMovement {
                message: err.to_string(),
            },
            SettlementError::NotProfitable { option_id, .. } => Self::NotExercisable {
                option_id,
                reason: err.to_string(),
            },
            SettlementError::ArithmeticOverflow { .. } => Self::AmountOutOfRange {
                message: err.to_string(),
            },
            SettlementError::EscrowMismatch { .. } | SettlementError::ProtocolViolation { .. } => {
                Self::InvariantViolation {
                    message: err.to_string(),
                }
            }
        }
    }
}

impl From<OptionError> for EngineError {
    fn from(err: OptionError) -> Self {
        match err {
            OptionError::InvalidParameters { .. } => Self::InvalidRequest {
                message: err.to_string(),
            },
            OptionError::Storage { .. } | OptionError::NotFound { .. } => Self::Persistence {
                message: err.to_string(),
            },
            OptionError::InvalidStateTransition { .. } => Self::InvariantViolation {
                message: err.to_string(),
            },
        }
    }
}

impl From<CommitmentError> for EngineError {
    fn from(err: CommitmentError) -> Self {
        match err {
            CommitmentError::MalformedSignature { .. } => Self::InvalidSignature {
                message: err.to_string(),
            },
            _ => Self::InvalidCommitment {
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn codes_map_to_statuses() {
        assert_eq!(ErrorCode::NonceMismatch.http_status(), 409);
        assert_eq!(ErrorCode::InsufficientReturn.http_status(), 422);
        assert_eq!(ErrorCode::ExternalRouterFailure.http_status(), 502);
        assert_eq!(ErrorCode::Paused.http_status(), 503);
        assert_eq!(ErrorCode::InvalidConfiguration.http_status(), 400);
    }

    #[test]
    fn ledger_errors_translate() {
        let err: EngineError = LedgerError::InsufficientCollateral {
            owner: Identity::new("lp"),
            asset: AssetId::new("WETH"),
            required: Amount::new(dec!(1)),
            available: Amount::new(dec!(0.5)),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::InsufficientCollateral);

        let err: EngineError = LedgerError::InsufficientBalance {
            owner: Identity::new("taker"),
            asset: AssetId::new("USDC"),
            required: Amount::new(dec!(10)),
            available: Amount::ZERO,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::InsufficientFunds);

        let err: EngineError = LedgerError::Overflow {
            asset: AssetId::new("USDC"),
            quantity: "balance of lp".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::AmountOutOfRange);
        assert_eq!(err.code().http_status(), 422);
    }

    #[test]
    fn code_serializes_as_reason() {
        let json = serde_json::to_string(&ErrorCode::SettlementInFlight).unwrap();
        assert_eq!(json, "\"SETTLEMENT_IN_FLIGHT\"");
        assert_eq!(ErrorCode::SettlementInFlight.to_string(), "SETTLEMENT_IN_FLIGHT");
    }
}
