//! Commitment validation errors.

use std::fmt;

use crate::domain::shared::AssetId;

/// Reasons a commitment violates its shape invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitmentError {
    /// Duration range is inverted or outside `[1, 365]`.
    InvalidDurationRange {
        /// Declared minimum.
        min: u16,
        /// Declared maximum.
        max: u16,
    },

    /// Amount is outside the configured band for the asset.
    AmountOutOfBounds {
        /// Asset of the commitment.
        asset: AssetId,
        /// Declared amount.
        amount: String,
        /// Band minimum.
        min: String,
        /// Band maximum.
        max: String,
    },

    /// No amount band is configured for the asset.
    UnsupportedAsset {
        /// Asset of the commitment.
        asset: AssetId,
    },

    /// Premium rate is zero or negative.
    NonPositivePremium {
        /// Declared premium rate.
        premium_rate: String,
    },

    /// Premium rate is above the accepted maximum.
    PremiumRateTooLarge {
        /// Declared premium rate.
        premium_rate: String,
        /// Largest accepted rate.
        max: String,
    },

    /// Signature bytes are not valid hex.
    MalformedSignature {
        /// Decoder message.
        message: String,
    },
}

impl fmt::Display for CommitmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDurationRange { min, max } => {
                write!(f, "Duration range [{min}, {max}] must satisfy 1 <= min <= max <= 365")
            }
            Self::AmountOutOfBounds {
                asset,
                amount,
                min,
                max,
            } => {
                write!(f, "Amount {amount} {asset} outside allowed band [{min}, {max}]")
            }
            Self::UnsupportedAsset { asset } => {
                write!(f, "No amount bounds configured for asset {asset}")
            }
            Self::NonPositivePremium { premium_rate } => {
                write!(f, "Premium rate must be positive, got {premium_rate}")
            }
            Self::PremiumRateTooLarge { premium_rate, max } => {
                write!(f, "Premium rate {premium_rate} exceeds the maximum {max}")
            }
            Self::MalformedSignature { message } => {
                write!(f, "Malformed signature: {message}")
            }
        }
    }
}

impl std::error::Error for CommitmentError {}
