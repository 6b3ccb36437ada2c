//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up signer identities, asset symbols and hashes.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    Identity,
    "Identity of a signer or caller (lower-case hex public key for Ed25519)."
);
define_id!(AssetId, "Asset symbol (e.g., \"WETH\", \"USDC\").");
define_id!(
    CommitmentHash,
    "Lower-case hex SHA-256 of a commitment's canonical encoding."
);

/// Monotonic identifier of an `ActiveOption`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionId(u64);

impl OptionId {
    /// Create an option id from its raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_roundtrip() {
        let id = Identity::new("ab12");
        assert_eq!(id.as_str(), "ab12");
        assert_eq!(id.to_string(), "ab12");
        assert_eq!(id.clone().into_inner(), "ab12".to_string());
    }

    #[test]
    fn ids_of_different_types_are_distinct() {
        let asset = AssetId::from("WETH");
        let identity = Identity::from("WETH");
        assert_eq!(asset.as_str(), identity.as_str());
    }

    #[test]
    fn option_id_ordering() {
        assert!(OptionId::new(2) > OptionId::new(1));
        assert_eq!(OptionId::new(7).to_string(), "7");
    }

    #[test]
    fn ids_serialize_transparently() {
        assert_eq!(serde_json::to_string(&AssetId::new("USDC")).unwrap(), "\"USDC\"");
        assert_eq!(serde_json::to_string(&OptionId::new(3)).unwrap(), "3");
    }
}
