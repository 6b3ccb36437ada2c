//! Commitment Store Port (Driven Port)
//!
//! Key-value store of published, unconsumed commitments keyed by commitment
//! hash. Only get/put/delete semantics are assumed.

use async_trait::async_trait;

use crate::domain::commitment::SignedCommitment;
use crate::domain::shared::CommitmentHash;

/// Commitment store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitmentStoreError {
    /// Backend failure.
    #[error("Commitment store error: {message}")]
    Storage {
        /// Details.
        message: String,
    },
}

/// Port for the commitment book.
#[async_trait]
pub trait CommitmentStorePort: Send + Sync {
    /// Insert or replace a commitment.
    async fn put(
        &self,
        hash: CommitmentHash,
        commitment: SignedCommitment,
    ) -> Result<(), CommitmentStoreError>;

    /// Fetch a commitment.
    async fn get(&self, hash: &CommitmentHash)
    -> Result<Option<SignedCommitment>, CommitmentStoreError>;

    /// Remove a commitment. Removing a missing key is not an error.
    async fn delete(&self, hash: &CommitmentHash) -> Result<(), CommitmentStoreError>;

    /// All stored commitments.
    async fn list(&self) -> Result<Vec<(CommitmentHash, SignedCommitment)>, CommitmentStoreError>;
}
