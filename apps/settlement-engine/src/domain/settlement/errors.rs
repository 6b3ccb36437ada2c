//! Settlement errors.

use rust_decimal::Decimal;
use std::fmt;

use crate::domain::shared::{Amount, BasisPoints, OptionId, Price};

/// Which check an insufficient return failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnCheck {
    /// Caller's `min_return` is below the required amount.
    MinReturn,
    /// Router quote is below the caller's `min_return`.
    Quote,
    /// Amount actually received is below `min_return`.
    Execution,
    /// Settlement needs a swap but no settlement parameters were supplied.
    MissingParameters,
}

impl ReturnCheck {
    /// Label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MinReturn => "min_return",
            Self::Quote => "quote",
            Self::Execution => "execution",
            Self::MissingParameters => "missing_parameters",
        }
    }
}

/// Errors raised while planning or verifying a settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    /// Proceeds (declared, quoted or received) fall short.
    InsufficientReturn {
        /// Failed check.
        check: ReturnCheck,
        /// Threshold that had to be met.
        required: Amount,
        /// Amount offered, quoted or received.
        actual: Amount,
    },

    /// Router quote implies a price too far from the oracle.
    ExcessivePriceMovement {
        /// Oracle price.
        oracle: Price,
        /// Price implied by the quote.
        implied: Decimal,
        /// Observed deviation in bps.
        deviation_bps: Decimal,
        /// Caller's tolerance.
        max_bps: BasisPoints,
    },

    /// The taker is not in the money at the settlement price.
    NotProfitable {
        /// Option id.
        option_id: OptionId,
        /// Strike.
        strike: Price,
        /// Settlement price.
        price: Price,
    },

    /// Escrow contents do not match the position.
    EscrowMismatch {
        /// Option id.
        option_id: OptionId,
        /// What is wrong.
        message: String,
    },

    /// A step was applied out of order or to the wrong plan.
    ProtocolViolation {
        /// What went wrong.
        message: String,
    },

    /// A settlement amount is too large to represent.
    ArithmeticOverflow {
        /// Quantity being computed.
        quantity: &'static str,
    },
}

impl SettlementError {
    pub(crate) const fn overflow(quantity: &'static str) -> Self {
        Self::ArithmeticOverflow { quantity }
    }
}

impl fmt::Display for SettlementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientReturn {
                check,
                required,
                actual,
            } => write!(
                f,
                "Insufficient return ({}): required {required}, got {actual}",
                check.as_str()
            ),
            Self::ExcessivePriceMovement {
                oracle,
                implied,
                deviation_bps,
                max_bps,
            } => write!(
                f,
                "Quote implies price {implied} vs oracle {oracle}: {deviation_bps}bps exceeds {max_bps}"
            ),
            Self::NotProfitable {
                option_id,
                strike,
                price,
            } => write!(
                f,
                "Option {option_id} not in the money: strike {strike}, price {price}"
            ),
            Self::EscrowMismatch { option_id, message } => {
                write!(f, "Escrow mismatch for option {option_id}: {message}")
            }
            Self::ProtocolViolation { message } => {
                write!(f, "Settlement protocol violation: {message}")
            }
            Self::ArithmeticOverflow { quantity } => {
                write!(f, "Settlement {quantity} is out of range")
            }
        }
    }
}

impl std::error::Error for SettlementError {}
