use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChimalliError;
use crate::traits::storage::ContentRef;

/// A registry record: an opaque reference owned by `owner`, releasable by
/// `keeper`, holding the content references of the shares left with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub reference: String,
    pub owner: String,
    pub keeper: String,
    #[serde(default)]
    pub shares: Vec<ContentRef>,
}

/// The ledger-backed registry of share holders.
///
/// Implementations report transient unavailability as
/// [`ChimalliError::Registry`]; callers decide whether to retry.
#[async_trait]
pub trait RegistryAdapter: Send + Sync {
    async fn list_entries(&self, account: &str) -> Result<Vec<RegistryEntry>, ChimalliError>;
    async fn create_entry(&self, owner: &str, keeper: &str) -> Result<RegistryEntry, ChimalliError>;

    /// Append share references to an existing entry. Unknown entries are
    /// [`ChimalliError::NotFound`]; references already held are kept once.
    async fn record_shares(
        &self,
        reference: &str,
        shares: &[ContentRef],
    ) -> Result<RegistryEntry, ChimalliError>;
}
