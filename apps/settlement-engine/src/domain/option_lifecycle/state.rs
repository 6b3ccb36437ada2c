//! Option states and the transitions allowed between them.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::OptionError;

/// Lifecycle state of an `ActiveOption`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionState {
    /// Collateral locked, exercisable until the deadline.
    Taken,
    /// Settled at the taker's request (terminal).
    Exercised,
    /// Resolved after the deadline (terminal).
    Expired,
}

impl OptionState {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Exercised | Self::Expired)
    }
}

impl fmt::Display for OptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Taken => write!(f, "TAKEN"),
            Self::Exercised => write!(f, "EXERCISED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

impl std::str::FromStr for OptionState {
    type Err = OptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TAKEN" => Ok(Self::Taken),
            "EXERCISED" => Ok(Self::Exercised),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(OptionError::InvalidParameters {
                field: "state".to_string(),
                message: format!("unknown option state '{other}'"),
            }),
        }
    }
}

/// Validates option state transitions.
pub struct OptionStateMachine;

impl OptionStateMachine {
    /// Check if a state transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: OptionState, to: OptionState) -> bool {
        matches!(
            (from, to),
            (OptionState::Taken, OptionState::Exercised) | (OptionState::Taken, OptionState::Expired)
        )
    }

    /// Validate a state transition.
    ///
    /// # Errors
    ///
    /// Returns error if the transition is invalid.
    pub fn validate_transition(from: OptionState, to: OptionState) -> Result<(), OptionError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(OptionError::InvalidStateTransition {
                from,
                to,
                reason: Self::transition_error_reason(from, to),
            })
        }
    }

    /// Human-readable reason for an invalid transition.
    #[must_use]
    pub fn transition_error_reason(from: OptionState, to: OptionState) -> String {
        match from {
            OptionState::Exercised => format!("Option was already exercised, cannot transition to {to}"),
            OptionState::Expired => format!("Option has already expired, cannot transition to {to}"),
            OptionState::Taken => format!("Invalid transition from {from} to {to}"),
        }
    }

    /// All valid next states from a given state.
    #[must_use]
    pub fn valid_next_states(from: OptionState) -> Vec<OptionState> {
        match from {
            OptionState::Taken => vec![OptionState::Exercised, OptionState::Expired],
            OptionState::Exercised | OptionState::Expired => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(OptionState::Taken, OptionState::Exercised, true)]
    #[test_case(OptionState::Taken, OptionState::Expired, true)]
    #[test_case(OptionState::Taken, OptionState::Taken, false)]
    #[test_case(OptionState::Exercised, OptionState::Expired, false)]
    #[test_case(OptionState::Expired, OptionState::Exercised, false)]
    #[test_case(OptionState::Expired, OptionState::Taken, false)]
    fn transitions(from: OptionState, to: OptionState, valid: bool) {
        assert_eq!(OptionStateMachine::is_valid_transition(from, to), valid);
    }

    #[test]
    fn terminal_states_have_no_successors() {
        assert!(OptionStateMachine::valid_next_states(OptionState::Exercised).is_empty());
        assert!(OptionStateMachine::valid_next_states(OptionState::Expired).is_empty());
        assert!(OptionState::Expired.is_terminal());
        assert!(!OptionState::Taken.is_terminal());
    }

    #[test]
    fn rejection_reason_names_terminal_state() {
        let err = OptionStateMachine::validate_transition(OptionState::Exercised, OptionState::Expired)
            .unwrap_err();
        assert!(err.to_string().contains("already exercised"));
    }

    #[test]
    fn parse_state() {
        assert_eq!("taken".parse::<OptionState>().unwrap(), OptionState::Taken);
        assert!("NONE".parse::<OptionState>().is_err());
    }
}
