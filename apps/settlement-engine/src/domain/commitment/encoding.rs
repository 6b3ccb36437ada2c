//! Canonical byte encoding of a commitment.
//!
//! The encoding is what gets signed. It carries a domain tag, a version byte
//! and the deployment id so a signature cannot be replayed against another
//! deployment or reinterpreted under different field semantics.
//!
//! ```text
//! "OPTION-COMMITMENT" || version:u8 || lp(deployment) || lp(creator) || lp(asset)
//!   || lp(amount) || lp(premium_rate) || min_days:u16be || max_days:u16be
//!   || option_type:u8 || commitment_type:u8 || expiry_ms:i64be || nonce:u64be
//! ```
//!
//! `lp(x)` is a big-endian `u32` byte length followed by the UTF-8 bytes.
//! Decimals are written in normalized form so `1.50` and `1.5` encode alike.

use sha2::{Digest, Sha256};

use super::model::Commitment;
use crate::domain::shared::CommitmentHash;

/// Domain separation tag prefixed to every encoding.
pub const COMMITMENT_DOMAIN_TAG: &[u8] = b"OPTION-COMMITMENT";

/// Version of the field layout.
pub const COMMITMENT_ENCODING_VERSION: u8 = 1;

/// Encodes commitments for a single deployment.
#[derive(Debug, Clone)]
pub struct CanonicalEncoder {
    deployment_id: String,
}

impl CanonicalEncoder {
    /// Create an encoder bound to a deployment.
    #[must_use]
    pub fn new(deployment_id: impl Into<String>) -> Self {
        Self {
            deployment_id: deployment_id.into(),
        }
    }

    /// The deployment this encoder binds signatures to.
    #[must_use]
    pub fn deployment_id(&self) -> &str {
        &self.deployment_id
    }

    /// Canonical bytes of a commitment.
    #[must_use]
    pub fn encode(&self, commitment: &Commitment) -> Vec<u8> {
        let mut out = Vec::with_capacity(160);
        out.extend_from_slice(COMMITMENT_DOMAIN_TAG);
        out.push(COMMITMENT_ENCODING_VERSION);
        push_len_prefixed(&mut out, self.deployment_id.as_bytes());
        push_len_prefixed(&mut out, commitment.creator.as_str().as_bytes());
        push_len_prefixed(&mut out, commitment.asset.as_str().as_bytes());
        push_len_prefixed(&mut out, commitment.amount.to_string().as_bytes());
        push_len_prefixed(&mut out, commitment.premium_rate.to_string().as_bytes());
        out.extend_from_slice(&commitment.min_duration_days.to_be_bytes());
        out.extend_from_slice(&commitment.max_duration_days.to_be_bytes());
        out.push(commitment.option_type.encoding_tag());
        out.push(commitment.commitment_type.encoding_tag());
        out.extend_from_slice(&commitment.expiry.unix_millis().to_be_bytes());
        out.extend_from_slice(&commitment.nonce.to_be_bytes());
        out
    }

    /// SHA-256 of the canonical encoding.
    #[must_use]
    pub fn hash(&self, commitment: &Commitment) -> CommitmentHash {
        let digest = Sha256::digest(self.encode(commitment));
        CommitmentHash::new(hex::encode(digest))
    }
}

fn push_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    // Field values are short strings; u32 lengths never truncate in practice.
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}
