//! Commitment Verifier
//!
//! Checks, in order: expiry, signer recovery over the canonical encoding,
//! nonce equality. The nonce check holds the creator's nonce slot; the slot
//! stays locked while the returned [`VerifiedCommitment`] lives, and the
//! nonce advances only when it is consumed. Concurrent takes of the same
//! creator's commitments therefore run one at a time, and a second taker of
//! the same commitment sees the advanced nonce.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::application::ports::{Clock, SignatureVerifier};
use crate::domain::commitment::{CanonicalEncoder, SignedCommitment};
use crate::domain::shared::{CommitmentHash, Identity};
use crate::error::EngineError;

/// Per-creator nonce counters, each behind its own lock.
#[derive(Debug, Default)]
pub struct NonceTable {
    slots: Mutex<HashMap<Identity, Arc<AsyncMutex<u64>>>>,
}

impl NonceTable {
    /// Create an empty table (every creator starts at nonce 0).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, creator: &Identity) -> Arc<AsyncMutex<u64>> {
        Arc::clone(
            self.slots
                .lock()
                .entry(creator.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(0))),
        )
    }

    /// Lock a creator's counter.
    pub async fn lock(&self, creator: &Identity) -> OwnedMutexGuard<u64> {
        self.slot(creator).lock_owned().await
    }

    /// Current nonce of a creator. Waits for any take in progress.
    pub async fn current(&self, creator: &Identity) -> u64 {
        *self.slot(creator).lock().await
    }
}

/// A commitment that passed every check, holding its creator's nonce slot.
///
/// Dropping it without [`consume`](Self::consume) leaves the nonce unchanged.
#[derive(Debug)]
pub struct VerifiedCommitment {
    hash: CommitmentHash,
    nonce: OwnedMutexGuard<u64>,
}

impl VerifiedCommitment {
    /// Commitment hash.
    #[must_use]
    pub const fn hash(&self) -> &CommitmentHash {
        &self.hash
    }

    /// Advance the creator's nonce and release the slot.
    pub fn consume(mut self) -> CommitmentHash {
        *self.nonce += 1;
        self.hash
    }
}

/// Validates signed commitments and guards their nonces.
pub struct CommitmentVerifier {
    encoder: CanonicalEncoder,
    verifier: Arc<dyn SignatureVerifier>,
    clock: Arc<dyn Clock>,
    nonces: NonceTable,
}

impl CommitmentVerifier {
    /// Create a verifier.
    #[must_use]
    pub fn new(
        encoder: CanonicalEncoder,
        verifier: Arc<dyn SignatureVerifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            encoder,
            verifier,
            clock,
            nonces: NonceTable::new(),
        }
    }

    /// Canonical hash of a commitment.
    #[must_use]
    pub fn hash(&self, signed: &SignedCommitment) -> CommitmentHash {
        self.encoder.hash(&signed.commitment)
    }

    /// Current nonce of a creator.
    pub async fn nonce_of(&self, creator: &Identity) -> u64 {
        self.nonces.current(creator).await
    }

    /// Check expiry and signature without touching the nonce.
    ///
    /// # Errors
    ///
    /// `CommitmentExpired` or `InvalidSignature`.
    pub fn verify_signature(&self, signed: &SignedCommitment) -> Result<CommitmentHash, EngineError> {
        let commitment = &signed.commitment;
        let now = self.clock.now();
        if !commitment.is_live_at(now) {
            return Err(EngineError::CommitmentExpired {
                expiry: commitment.expiry,
                now,
            });
        }

        let message = self.encoder.encode(commitment);
        let signer = self
            .verifier
            .recover(&message, &signed.signature)
            .map_err(|e| EngineError::InvalidSignature {
                message: e.to_string(),
            })?;
        if signer != commitment.creator {
            return Err(EngineError::InvalidSignature {
                message: format!(
                    "signature recovers to {signer}, commitment creator is {}",
                    commitment.creator
                ),
            });
        }

        Ok(self.encoder.hash(commitment))
    }

    /// Run all checks and hold the creator's nonce slot.
    ///
    /// # Errors
    ///
    /// `CommitmentExpired`, `InvalidSignature` or `NonceMismatch`.
    pub async fn begin(&self, signed: &SignedCommitment) -> Result<VerifiedCommitment, EngineError> {
        let hash = self.verify_signature(signed)?;
        let commitment = &signed.commitment;

        let nonce = self.nonces.lock(&commitment.creator).await;
        if *nonce != commitment.nonce {
            return Err(EngineError::NonceMismatch {
                creator: commitment.creator.clone(),
                expected: *nonce,
                actual: commitment.nonce,
            });
        }

        Ok(VerifiedCommitment { hash, nonce })
    }

    /// Verify and advance the nonce in one step.
    ///
    /// # Errors
    ///
    /// `CommitmentExpired`, `InvalidSignature` or `NonceMismatch`.
    pub async fn verify_and_consume(
        &self,
        signed: &SignedCommitment,
    ) -> Result<CommitmentHash, EngineError> {
        Ok(self.begin(signed).await?.consume())
    }
}
