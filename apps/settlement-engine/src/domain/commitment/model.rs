//! Commitment data model.

use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::errors::CommitmentError;
use crate::domain::shared::{Amount, AssetId, Identity, Price, Timestamp};

/// Shortest lock duration a commitment may declare.
pub const MIN_DURATION_DAYS: u16 = 1;

/// Longest lock duration a commitment may declare.
pub const MAX_DURATION_DAYS: u16 = 365;

/// Largest premium rate a commitment may declare, in quote currency.
pub const MAX_PREMIUM_RATE: Amount = Amount::new(dec!(1_000_000_000_000));

/// Option right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionType {
    /// Right to the upside above strike.
    Call,
    /// Right to the downside below strike.
    Put,
}

impl OptionType {
    /// Whether the taker profits at `price` for the given `strike`.
    #[must_use]
    pub fn is_profitable(&self, strike: Price, price: Price) -> bool {
        match self {
            Self::Call => price > strike,
            Self::Put => price < strike,
        }
    }

    /// Byte tag used in the canonical encoding.
    #[must_use]
    pub const fn encoding_tag(&self) -> u8 {
        match self {
            Self::Call => 0,
            Self::Put => 1,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// Direction of a commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitmentType {
    /// Creator supplies collateral and charges a daily premium rate.
    Offer,
    /// Creator pays a fixed premium and expects a counterparty to collateralize.
    Demand,
}

impl CommitmentType {
    /// Byte tag used in the canonical encoding.
    #[must_use]
    pub const fn encoding_tag(&self) -> u8 {
        match self {
            Self::Offer => 0,
            Self::Demand => 1,
        }
    }
}

impl fmt::Display for CommitmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offer => write!(f, "OFFER"),
            Self::Demand => write!(f, "DEMAND"),
        }
    }
}

/// Per-asset band a commitment amount must fall within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountBounds {
    /// Smallest allowed amount (inclusive).
    pub min_amount: Amount,
    /// Largest allowed amount (inclusive).
    pub max_amount: Amount,
}

impl AmountBounds {
    /// Whether `amount` is inside the band.
    #[must_use]
    pub fn contains(&self, amount: Amount) -> bool {
        amount >= self.min_amount && amount <= self.max_amount
    }
}

/// A signed declaration of intent to trade, immutable once signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    /// Identity of the signer.
    pub creator: Identity,
    /// Underlying asset.
    pub asset: AssetId,
    /// Quantity of underlying.
    pub amount: Amount,
    /// Daily rate (OFFER) or fixed total (DEMAND), in quote currency.
    pub premium_rate: Amount,
    /// Shortest lock the creator accepts.
    pub min_duration_days: u16,
    /// Longest lock the creator accepts.
    pub max_duration_days: u16,
    /// CALL or PUT.
    pub option_type: OptionType,
    /// OFFER or DEMAND.
    pub commitment_type: CommitmentType,
    /// After this instant the commitment can no longer be taken.
    pub expiry: Timestamp,
    /// Creator's nonce at signing time.
    pub nonce: u64,
}

impl Commitment {
    /// Validate the shape invariants against the asset's amount band.
    ///
    /// # Errors
    ///
    /// Returns the first invariant the commitment violates.
    pub fn validate_shape(&self, bounds: Option<&AmountBounds>) -> Result<(), CommitmentError> {
        if self.min_duration_days < MIN_DURATION_DAYS
            || self.max_duration_days > MAX_DURATION_DAYS
            || self.min_duration_days > self.max_duration_days
        {
            return Err(CommitmentError::InvalidDurationRange {
                min: self.min_duration_days,
                max: self.max_duration_days,
            });
        }

        if !self.premium_rate.is_positive() {
            return Err(CommitmentError::NonPositivePremium {
                premium_rate: self.premium_rate.to_string(),
            });
        }
        if self.premium_rate > MAX_PREMIUM_RATE {
            return Err(CommitmentError::PremiumRateTooLarge {
                premium_rate: self.premium_rate.to_string(),
                max: MAX_PREMIUM_RATE.to_string(),
            });
        }

        let Some(bounds) = bounds else {
            return Err(CommitmentError::UnsupportedAsset {
                asset: self.asset.clone(),
            });
        };

        if !bounds.contains(self.amount) {
            return Err(CommitmentError::AmountOutOfBounds {
                asset: self.asset.clone(),
                amount: self.amount.to_string(),
                min: bounds.min_amount.to_string(),
                max: bounds.max_amount.to_string(),
            });
        }

        Ok(())
    }

    /// Whether the commitment can still be taken at `now`.
    #[must_use]
    pub fn is_live_at(&self, now: Timestamp) -> bool {
        now <= self.expiry
    }
}

/// Raw signature bytes, serialized as lower-case hex.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature(Vec<u8>);

impl Signature {
    /// Wrap raw signature bytes.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Decode from a hex string (optional `0x` prefix).
    ///
    /// # Errors
    ///
    /// Returns error if the string is not valid hex.
    pub fn from_hex(s: &str) -> Result<Self, CommitmentError> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(trimmed)
            .map(Self)
            .map_err(|e| CommitmentError::MalformedSignature {
                message: e.to_string(),
            })
    }

    /// Get the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A commitment together with its creator's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCommitment {
    /// The signed payload.
    pub commitment: Commitment,
    /// Signature over the canonical encoding.
    pub signature: Signature,
}
