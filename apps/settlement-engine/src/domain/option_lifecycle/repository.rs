//! Option Repository Trait
//!
//! Persistence abstraction for `ActiveOption` records, keyed by option id.

use async_trait::async_trait;

use super::aggregate::ActiveOption;
use super::errors::OptionError;
use super::state::OptionState;
use crate::domain::shared::{AssetId, OptionId};

/// Repository trait for `ActiveOption` persistence.
#[async_trait]
pub trait OptionRepository: Send + Sync {
    /// Save an option (insert or update).
    ///
    /// # Errors
    ///
    /// Returns error if persistence fails.
    async fn save(&self, option: &ActiveOption) -> Result<(), OptionError>;

    /// Find an option by id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_id(&self, id: OptionId) -> Result<Option<ActiveOption>, OptionError>;

    /// Find all options in a given state.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_state(&self, state: OptionState) -> Result<Vec<ActiveOption>, OptionError>;

    /// Find all options written on an asset.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_asset(&self, asset: &AssetId) -> Result<Vec<ActiveOption>, OptionError>;

    /// Every stored option.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_all(&self) -> Result<Vec<ActiveOption>, OptionError>;
}
