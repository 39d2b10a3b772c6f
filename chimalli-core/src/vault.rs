//! Moves protected shares in and out of the content store and keeps the
//! registry of keepers. Collaborator failures are returned to the caller
//! unchanged; nothing here retries.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SharingConfig;
use crate::error::{ChimalliError, Result};
use crate::keys::{PrivateKey, PublicKey};
use crate::pipeline::{protect, protect_with_config, reveal, EncryptedShare};
use crate::traits::random::SecureRandom;
use crate::traits::registry::{RegistryAdapter, RegistryEntry};
use crate::traits::storage::{ContentRef, ContentStore};

/// Where one encrypted share ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredShare {
    pub index: u8,
    pub reference: ContentRef,
}

pub struct ShareVault<C, R> {
    content: Arc<C>,
    registry: Arc<R>,
}

impl<C: ContentStore, R: RegistryAdapter> ShareVault<C, R> {
    pub fn new(content: Arc<C>, registry: Arc<R>) -> Self {
        Self { content, registry }
    }

    /// Put every encrypted share into the content store, stopping at the first failure.
    pub async fn store_shares(&self, shares: &[EncryptedShare]) -> Result<Vec<StoredShare>> {
        let mut stored = Vec::with_capacity(shares.len());
        for share in shares {
            let reference = self.content.put(&share.to_bytes()?).await?;
            debug!("Stored share {} as {}", share.index, reference);
            stored.push(StoredShare { index: share.index, reference });
        }
        Ok(stored)
    }

    /// Fetch every referenced share; any missing blob is an error.
    pub async fn fetch_shares(&self, references: &[ContentRef]) -> Result<Vec<EncryptedShare>> {
        let mut shares = Vec::with_capacity(references.len());
        for reference in references {
            let bytes = self.content.get(reference).await?;
            shares.push(EncryptedShare::from_bytes(&bytes)?);
        }
        Ok(shares)
    }

    /// Fetch whatever referenced shares still exist, skipping lost blobs.
    pub async fn fetch_available(&self, references: &[ContentRef]) -> Result<Vec<EncryptedShare>> {
        let mut shares = Vec::with_capacity(references.len());
        for reference in references {
            match self.content.get(reference).await {
                Ok(bytes) => shares.push(EncryptedShare::from_bytes(&bytes)?),
                Err(ChimalliError::NotFound(_)) => warn!("Share {} is no longer available", reference),
                Err(e) => return Err(e),
            }
        }
        Ok(shares)
    }

    /// Protect `secret` for `recipient` and store the resulting shares.
    pub async fn deposit(
        &self,
        secret: &[u8],
        config: &SharingConfig,
        recipient: &PublicKey,
        rng: &dyn SecureRandom,
    ) -> Result<Vec<StoredShare>> {
        let sealed = protect_with_config(secret, config, recipient, rng)?;
        let stored = self.store_shares(&sealed).await?;
        info!("Deposited {} shares for {}", stored.len(), recipient.fingerprint());
        Ok(stored)
    }

    /// Fetch the surviving shares and reveal the secret.
    pub async fn recover(&self, references: &[ContentRef], private_key: &PrivateKey) -> Result<Vec<u8>> {
        let shares = self.fetch_available(references).await?;
        reveal(&shares, private_key)
    }

    pub async fn register_keeper(&self, owner: &str, keeper: &str) -> Result<RegistryEntry> {
        let entry = self.registry.create_entry(owner, keeper).await?;
        info!("Registered keeper {} for {} at {}", keeper, owner, entry.reference);
        Ok(entry)
    }

    pub async fn entries(&self, account: &str) -> Result<Vec<RegistryEntry>> {
        self.registry.list_entries(account).await
    }

    /// Protect `secret` with one share per keeper and record each share's
    /// reference against a fresh registry entry for that keeper.
    ///
    /// Entries are created in keeper order; a registry failure part way
    /// through is returned as is and the entries already created stay.
    pub async fn deposit_for(
        &self,
        owner: &str,
        keepers: &[String],
        threshold: u8,
        recipient: &PublicKey,
        secret: &[u8],
        rng: &dyn SecureRandom,
    ) -> Result<Vec<RegistryEntry>> {
        let total = u8::try_from(keepers.len()).map_err(|_| {
            ChimalliError::InvalidParameters(format!("too many keepers: {}", keepers.len()))
        })?;
        let sealed = protect(secret, total, threshold, recipient, rng)?;
        let stored = self.store_shares(&sealed).await?;

        let mut entries = Vec::with_capacity(keepers.len());
        for (keeper, share) in keepers.iter().zip(&stored) {
            let entry = self.registry.create_entry(owner, keeper).await?;
            let entry = self.registry.record_shares(&entry.reference, &[share.reference]).await?;
            debug!("Keeper {} holds share {} at {}", keeper, share.index, entry.reference);
            entries.push(entry);
        }

        info!(
            "Deposited {} shares for {} with {} keepers (threshold {})",
            stored.len(),
            owner,
            keepers.len(),
            threshold
        );
        Ok(entries)
    }

    /// Content references held by the given entries of `account`.
    pub async fn held_shares(&self, account: &str, entry_references: &[String]) -> Result<Vec<ContentRef>> {
        let entries = self.registry.list_entries(account).await?;

        let mut shares = Vec::new();
        for wanted in entry_references {
            let entry = entries
                .iter()
                .find(|e| &e.reference == wanted)
                .ok_or_else(|| ChimalliError::NotFound(format!("registry entry not found: {wanted}")))?;
            for share in &entry.shares {
                if !shares.contains(share) {
                    shares.push(*share);
                }
            }
        }
        Ok(shares)
    }

    /// Reveal the secret whose shares the given registry entries hold.
    pub async fn recover_held(
        &self,
        account: &str,
        entry_references: &[String],
        private_key: &PrivateKey,
    ) -> Result<Vec<u8>> {
        let shares = self.held_shares(account, entry_references).await?;
        self.recover(&shares, private_key).await
    }
}
