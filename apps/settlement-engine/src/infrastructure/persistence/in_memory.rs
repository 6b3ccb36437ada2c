//! In-memory option repository and commitment store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::ports::{CommitmentStoreError, CommitmentStorePort};
use crate::domain::commitment::SignedCommitment;
use crate::domain::option_lifecycle::{ActiveOption, OptionError, OptionRepository, OptionState};
use crate::domain::shared::{AssetId, CommitmentHash, OptionId};

/// In-memory implementation of `OptionRepository`.
///
/// Suitable for testing and single-process deployments. Contents are lost
/// on restart.
#[derive(Debug, Default)]
pub struct InMemoryOptionRepository {
    options: RwLock<HashMap<OptionId, ActiveOption>>,
}

impl InMemoryOptionRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.options.read().len()
    }

    /// Whether the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.read().is_empty()
    }
}

#[async_trait]
impl OptionRepository for InMemoryOptionRepository {
    async fn save(&self, option: &ActiveOption) -> Result<(), OptionError> {
        let mut stripped = option.clone();
        stripped.drain_events();
        self.options.write().insert(option.id(), stripped);
        Ok(())
    }

    async fn find_by_id(&self, id: OptionId) -> Result<Option<ActiveOption>, OptionError> {
        Ok(self.options.read().get(&id).cloned())
    }

    async fn find_by_state(&self, state: OptionState) -> Result<Vec<ActiveOption>, OptionError> {
        Ok(self
            .options
            .read()
            .values()
            .filter(|o| o.state() == state)
            .cloned()
            .collect())
    }

    async fn find_by_asset(&self, asset: &AssetId) -> Result<Vec<ActiveOption>, OptionError> {
        Ok(self
            .options
            .read()
            .values()
            .filter(|o| o.asset() == asset)
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<ActiveOption>, OptionError> {
        Ok(self.options.read().values().cloned().collect())
    }
}

/// In-memory implementation of `CommitmentStorePort`.
#[derive(Debug, Default)]
pub struct InMemoryCommitmentStore {
    commitments: RwLock<HashMap<CommitmentHash, SignedCommitment>>,
}

impl InMemoryCommitmentStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommitmentStorePort for InMemoryCommitmentStore {
    async fn put(
        &self,
        hash: CommitmentHash,
        commitment: SignedCommitment,
    ) -> Result<(), CommitmentStoreError> {
        self.commitments.write().insert(hash, commitment);
        Ok(())
    }

    async fn get(
        &self,
        hash: &CommitmentHash,
    ) -> Result<Option<SignedCommitment>, CommitmentStoreError> {
        Ok(self.commitments.read().get(hash).cloned())
    }

    async fn delete(&self, hash: &CommitmentHash) -> Result<(), CommitmentStoreError> {
        self.commitments.write().remove(hash);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<(CommitmentHash, SignedCommitment)>, CommitmentStoreError> {
        let mut entries: Vec<_> = self
            .commitments
            .read()
            .iter()
            .map(|(h, c)| (h.clone(), c.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::collateral::Credit;
    use crate::domain::commitment::{Commitment, CommitmentType, OptionType, Signature};
    use crate::domain::option_lifecycle::OpenOptionCommand;
    use crate::domain::shared::{Amount, Identity, Price, Timestamp};
    use rust_decimal_macros::dec;

    fn option(id: u64, asset: &str) -> ActiveOption {
        ActiveOption::open(OpenOptionCommand {
            id: OptionId::new(id),
            commitment_hash: CommitmentHash::new(format!("h{id}")),
            taker: Identity::new("taker"),
            lp: Identity::new("lp"),
            asset: AssetId::new(asset),
            amount: Amount::new(dec!(0.5)),
            strike_price: Price::new(dec!(3500)),
            premium: Amount::new(dec!(10)),
            lock_duration_days: 3,
            taken_at: Timestamp::from_unix_millis(0).unwrap(),
            option_type: OptionType::Call,
            commitment_type: CommitmentType::Offer,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn save_and_find() {
        let repo = InMemoryOptionRepository::new();
        repo.save(&option(1, "WETH")).await.unwrap();
        repo.save(&option(2, "WBTC")).await.unwrap();

        assert_eq!(repo.len(), 2);
        let found = repo.find_by_id(OptionId::new(1)).await.unwrap().unwrap();
        assert_eq!(found.asset(), &AssetId::new("WETH"));
        assert!(found.pending_events().is_empty());
        assert!(repo.find_by_id(OptionId::new(9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_state_and_asset() {
        let repo = InMemoryOptionRepository::new();
        let mut exercised = option(1, "WETH");
        exercised
            .mark_exercised(
                Price::new(dec!(4000)),
                vec![Credit::new(Identity::new("taker"), AssetId::new("USDC"), Amount::new(dec!(250)))],
                Timestamp::from_unix_millis(10).unwrap(),
            )
            .unwrap();
        repo.save(&exercised).await.unwrap();
        repo.save(&option(2, "WETH")).await.unwrap();

        let taken = repo.find_by_state(OptionState::Taken).await.unwrap();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].id(), OptionId::new(2));
        assert_eq!(repo.find_by_asset(&AssetId::new("WETH")).await.unwrap().len(), 2);
        assert!(repo.find_by_asset(&AssetId::new("WBTC")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn commitment_store_crud() {
        let store = InMemoryCommitmentStore::new();
        let signed = SignedCommitment {
            commitment: Commitment {
                creator: Identity::new("alice"),
                asset: AssetId::new("WETH"),
                amount: Amount::new(dec!(0.5)),
                premium_rate: Amount::new(dec!(3)),
                min_duration_days: 1,
                max_duration_days: 7,
                option_type: OptionType::Call,
                commitment_type: CommitmentType::Offer,
                expiry: Timestamp::from_unix_millis(5_000).unwrap(),
                nonce: 0,
            },
            signature: Signature::new(vec![1, 2, 3]),
        };
        let hash = CommitmentHash::new("abc");

        store.put(hash.clone(), signed.clone()).await.unwrap();
        assert_eq!(store.get(&hash).await.unwrap(), Some(signed));
        assert_eq!(store.list().await.unwrap().len(), 1);

        store.delete(&hash).await.unwrap();
        assert!(store.get(&hash).await.unwrap().is_none());
        store.delete(&hash).await.unwrap();
    }
}
