//! Ed25519 signature verification.
//!
//! A commitment signature is `public_key (32 bytes) || signature (64 bytes)`.
//! Recovery verifies the signature against the embedded key and returns the
//! key as a lower-case hex identity, so the commitment's `creator` must be
//! that hex string.

use ed25519_dalek::{
    PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH, Signature as DalekSignature, Signer, SigningKey,
    VerifyingKey,
};

use crate::application::ports::{SignatureError, SignatureVerifier};
use crate::domain::commitment::{CanonicalEncoder, Commitment, Signature, SignedCommitment};
use crate::domain::shared::Identity;

/// Length of an encoded commitment signature.
pub const ENCODED_SIGNATURE_LENGTH: usize = PUBLIC_KEY_LENGTH + SIGNATURE_LENGTH;

/// Verifies `public_key || signature` blobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn recover(&self, message: &[u8], signature: &Signature) -> Result<Identity, SignatureError> {
        let bytes = signature.as_bytes();
        if bytes.len() != ENCODED_SIGNATURE_LENGTH {
            return Err(SignatureError::Malformed {
                message: format!(
                    "expected {ENCODED_SIGNATURE_LENGTH} bytes, got {}",
                    bytes.len()
                ),
            });
        }
        let (key_bytes, sig_bytes) = bytes.split_at(PUBLIC_KEY_LENGTH);

        let key_bytes: [u8; PUBLIC_KEY_LENGTH] =
            key_bytes.try_into().map_err(|_| SignatureError::Malformed {
                message: "bad public key length".to_string(),
            })?;
        let sig_bytes: [u8; SIGNATURE_LENGTH] =
            sig_bytes.try_into().map_err(|_| SignatureError::Malformed {
                message: "bad signature length".to_string(),
            })?;

        let key = VerifyingKey::from_bytes(&key_bytes).map_err(|e| SignatureError::Malformed {
            message: e.to_string(),
        })?;
        key.verify_strict(message, &DalekSignature::from_bytes(&sig_bytes))
            .map_err(|_| SignatureError::VerificationFailed)?;

        Ok(identity_of(&key))
    }
}

/// Identity string of a verifying key.
#[must_use]
pub fn identity_of(key: &VerifyingKey) -> Identity {
    Identity::new(hex::encode(key.as_bytes()))
}

/// Signs commitments with an Ed25519 key. Used by clients and tests.
#[derive(Debug, Clone)]
pub struct Ed25519Signer {
    key: SigningKey,
}

impl Ed25519Signer {
    /// Derive a signer from a 32-byte seed.
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(&seed),
        }
    }

    /// The identity commitments from this signer must name as `creator`.
    #[must_use]
    pub fn identity(&self) -> Identity {
        identity_of(&self.key.verifying_key())
    }

    /// Sign raw bytes, producing `public_key || signature`.
    #[must_use]
    pub fn sign_bytes(&self, message: &[u8]) -> Signature {
        let mut out = Vec::with_capacity(ENCODED_SIGNATURE_LENGTH);
        out.extend_from_slice(self.key.verifying_key().as_bytes());
        out.extend_from_slice(&self.key.sign(message).to_bytes());
        Signature::new(out)
    }

    /// Sign a commitment's canonical encoding.
    #[must_use]
    pub fn sign(&self, encoder: &CanonicalEncoder, commitment: Commitment) -> SignedCommitment {
        let signature = self.sign_bytes(&encoder.encode(&commitment));
        SignedCommitment {
            commitment,
            signature,
        }
    }
}
