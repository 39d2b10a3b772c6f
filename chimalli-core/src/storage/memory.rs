use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::ChimalliError;
use crate::traits::registry::{RegistryAdapter, RegistryEntry};
use crate::traits::storage::{ContentRef, ContentStore, PersistentStorage};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Volatile key-value store. `set_unavailable(true)` makes every call fail
/// with a retryable storage error.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
    unavailable: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), ChimalliError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ChimalliError::Storage("key-value store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistentStorage for MemoryStorage {
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), ChimalliError> {
        self.check()?;
        lock(&self.entries).insert(key.to_string(), value.to_vec());
        debug!("Set key '{}' ({} bytes)", key, value.len());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ChimalliError> {
        self.check()?;
        Ok(lock(&self.entries).get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), ChimalliError> {
        self.check()?;
        lock(&self.entries).remove(key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, ChimalliError> {
        self.check()?;
        Ok(lock(&self.entries)
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Volatile content-addressed blob store.
#[derive(Default)]
pub struct MemoryContentStore {
    blobs: Mutex<HashMap<ContentRef, Vec<u8>>>,
    unavailable: AtomicBool,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        lock(&self.blobs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop a blob, simulating a keeper that lost its share.
    pub fn forget(&self, reference: &ContentRef) {
        lock(&self.blobs).remove(reference);
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, data: &[u8]) -> Result<ContentRef, ChimalliError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ChimalliError::Storage("content store unavailable".to_string()));
        }
        let reference = ContentRef::for_data(data);
        lock(&self.blobs).insert(reference, data.to_vec());
        Ok(reference)
    }

    async fn get(&self, reference: &ContentRef) -> Result<Vec<u8>, ChimalliError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ChimalliError::Storage("content store unavailable".to_string()));
        }
        lock(&self.blobs)
            .get(reference)
            .cloned()
            .ok_or_else(|| ChimalliError::NotFound(format!("blob not found: {reference}")))
    }
}

/// Volatile registry. References look like contract addresses.
#[derive(Default)]
pub struct MemoryRegistry {
    entries: Mutex<Vec<RegistryEntry>>,
    nonce: AtomicU64,
    unavailable: AtomicBool,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), ChimalliError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ChimalliError::Registry("registry unavailable".to_string()));
        }
        Ok(())
    }
}

/// `0x` + 20 bytes of SHA-256(owner || keeper || nonce).
pub fn derive_entry_reference(owner: &str, keeper: &str, nonce: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(owner.as_bytes());
    hasher.update([0u8]);
    hasher.update(keeper.as_bytes());
    hasher.update(nonce.to_be_bytes());
    let digest = hasher.finalize();
    format!("0x{}", hex::encode(&digest[..20]))
}

#[async_trait]
impl RegistryAdapter for MemoryRegistry {
    async fn list_entries(&self, account: &str) -> Result<Vec<RegistryEntry>, ChimalliError> {
        self.check()?;
        Ok(lock(&self.entries)
            .iter()
            .filter(|e| e.owner == account)
            .cloned()
            .collect())
    }

    async fn create_entry(&self, owner: &str, keeper: &str) -> Result<RegistryEntry, ChimalliError> {
        self.check()?;
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let entry = RegistryEntry {
            reference: derive_entry_reference(owner, keeper, nonce),
            owner: owner.to_string(),
            keeper: keeper.to_string(),
            shares: Vec::new(),
        };
        lock(&self.entries).push(entry.clone());
        Ok(entry)
    }

    async fn record_shares(
        &self,
        reference: &str,
        shares: &[ContentRef],
    ) -> Result<RegistryEntry, ChimalliError> {
        self.check()?;
        let mut entries = lock(&self.entries);
        let entry = entries
            .iter_mut()
            .find(|e| e.reference == reference)
            .ok_or_else(|| ChimalliError::NotFound(format!("registry entry not found: {reference}")))?;
        for share in shares {
            if !entry.shares.contains(share) {
                entry.shares.push(*share);
            }
        }
        debug!("Entry {} now holds {} shares", reference, entry.shares.len());
        Ok(entry.clone())
    }
}
