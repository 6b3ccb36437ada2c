//! Signature Verifier Port (Driven Port)
//!
//! `(canonical bytes, signature) → identity`. Swappable for a deterministic
//! stub in tests.

use crate::domain::commitment::Signature;
use crate::domain::shared::Identity;

/// Signature recovery error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// Signature bytes have the wrong shape.
    #[error("Malformed signature: {message}")]
    Malformed {
        /// Details.
        message: String,
    },

    /// Signature does not verify against the message.
    #[error("Signature verification failed")]
    VerificationFailed,
}

/// Recovers the signer of a message.
pub trait SignatureVerifier: Send + Sync {
    /// Identity that produced `signature` over `message`.
    ///
    /// # Errors
    ///
    /// Returns error if the signature is malformed or does not verify.
    fn recover(&self, message: &[u8], signature: &Signature) -> Result<Identity, SignatureError>;
}
