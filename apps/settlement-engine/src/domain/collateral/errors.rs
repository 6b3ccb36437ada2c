//! Ledger errors.

use std::fmt;

use crate::domain::shared::{Amount, AssetId, Identity, OptionId};

/// Errors raised by the collateral ledger. Every failing operation leaves
/// the ledger untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The LP's free balance cannot cover the collateral to lock.
    InsufficientCollateral {
        /// Liquidity provider.
        owner: Identity,
        /// Collateral asset.
        asset: AssetId,
        /// Amount to lock.
        required: Amount,
        /// Free balance.
        available: Amount,
    },

    /// A free balance cannot cover a debit (premium, withdrawal).
    InsufficientBalance {
        /// Account owner.
        owner: Identity,
        /// Asset debited.
        asset: AssetId,
        /// Amount requested.
        required: Amount,
        /// Free balance.
        available: Amount,
    },

    /// Deposits and withdrawals must move a positive amount.
    NonPositiveAmount {
        /// Offending amount.
        amount: Amount,
    },

    /// No reservation or escrow exists for the option.
    UnknownPosition {
        /// Option id.
        option_id: OptionId,
    },

    /// A reservation or escrow already exists for the option.
    DuplicatePosition {
        /// Option id.
        option_id: OptionId,
    },

    /// A settlement would create or destroy funds.
    ConservationViolated {
        /// Asset whose books do not balance.
        asset: AssetId,
        /// Funds available to distribute.
        available: Amount,
        /// Funds the settlement tried to credit.
        credited: Amount,
    },

    /// A swap does not match the escrow it claims to spend.
    EscrowMismatch {
        /// Option id.
        option_id: OptionId,
        /// Description of the mismatch.
        message: String,
    },

    /// A balance or running total would leave the representable range.
    Overflow {
        /// Asset being totalled.
        asset: AssetId,
        /// What overflowed.
        quantity: String,
    },
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientCollateral {
                owner,
                asset,
                required,
                available,
            } => write!(
                f,
                "Insufficient collateral for {owner}: need {required} {asset}, have {available}"
            ),
            Self::InsufficientBalance {
                owner,
                asset,
                required,
                available,
            } => write!(
                f,
                "Insufficient balance for {owner}: need {required} {asset}, have {available}"
            ),
            Self::NonPositiveAmount { amount } => {
                write!(f, "Amount must be positive, got {amount}")
            }
            Self::UnknownPosition { option_id } => {
                write!(f, "No ledger position for option {option_id}")
            }
            Self::DuplicatePosition { option_id } => {
                write!(f, "Ledger position already exists for option {option_id}")
            }
            Self::ConservationViolated {
                asset,
                available,
                credited,
            } => write!(
                f,
                "Settlement does not conserve {asset}: available {available}, credited {credited}"
            ),
            Self::EscrowMismatch { option_id, message } => {
                write!(f, "Escrow mismatch for option {option_id}: {message}")
            }
            Self::Overflow { asset, quantity } => {
                write!(f, "{asset} {quantity} is out of range")
            }
        }
    }
}

impl std::error::Error for LedgerError {}
