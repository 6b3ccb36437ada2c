//! Option lifecycle errors.

use std::fmt;

use super::state::OptionState;

/// Errors raised by the `ActiveOption` aggregate and its repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionError {
    /// Invalid state transition attempted.
    InvalidStateTransition {
        /// Current state.
        from: OptionState,
        /// Attempted state.
        to: OptionState,
        /// Reason for failure.
        reason: String,
    },

    /// Invalid parameters when opening or querying options.
    InvalidParameters {
        /// Field with invalid value.
        field: String,
        /// Error message.
        message: String,
    },

    /// Option not found.
    NotFound {
        /// Option id.
        option_id: String,
    },

    /// Storage backend failure.
    Storage {
        /// Error message.
        message: String,
    },
}

impl fmt::Display for OptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStateTransition { from, to, reason } => {
                write!(f, "Invalid option state transition: {from} -> {to}: {reason}")
            }
            Self::InvalidParameters { field, message } => {
                write!(f, "Invalid option parameter '{field}': {message}")
            }
            Self::NotFound { option_id } => write!(f, "Option not found: {option_id}"),
            Self::Storage { message } => write!(f, "Option storage error: {message}"),
        }
    }
}

impl std::error::Error for OptionError {}
