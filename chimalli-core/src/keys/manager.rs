use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::keypair::{decrypt, encrypt, Keypair, PublicKey};
use super::record::KeypairRecord;
use crate::config::validate_key_bits;
use crate::constants::{KEY_KEYPAIR, PBKDF2_ITERATIONS};
use crate::error::{ChimalliError, Result};
use crate::traits::random::SecureRandom;
use crate::traits::storage::PersistentStorage;

/// Observable keypair state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Empty,
    Generating,
    Ready,
}

enum KeyState {
    Empty,
    /// `previous` is restored if the generation fails.
    Generating { previous: Option<Keypair> },
    Ready(Keypair),
}

/// Handle to a key generation running in the background.
pub struct KeyGeneration {
    handle: JoinHandle<Result<PublicKey>>,
}

impl KeyGeneration {
    /// Wait for the new keypair to be generated and persisted.
    pub async fn wait(self) -> Result<PublicKey> {
        self.handle
            .await
            .map_err(|e| ChimalliError::KeyGeneration(format!("generation task aborted: {e}")))?
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Owns the local keypair: loads it from durable storage, generates
/// replacements off the caller's task, and encrypts/decrypts with it.
///
/// While a generation is in flight the manager reports
/// [`KeyStatus::Generating`] and hands out no keypair; the persisted record
/// is only replaced once the new keypair exists. Generation, `load`,
/// `persist` and `clear` exclude each other: a call that finds another one
/// in flight fails with [`ChimalliError::KeyGeneration`] instead of waiting.
pub struct KeyManager<S> {
    storage: Arc<S>,
    rng: Arc<dyn SecureRandom>,
    passphrase: Option<Arc<Zeroizing<String>>>,
    kdf_iterations: u32,
    state: Arc<RwLock<KeyState>>,
    /// Held for the whole of any operation that rewrites `state` or storage.
    busy: Arc<Mutex<()>>,
}

impl<S> Clone for KeyManager<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            rng: self.rng.clone(),
            passphrase: self.passphrase.clone(),
            kdf_iterations: self.kdf_iterations,
            state: self.state.clone(),
            busy: self.busy.clone(),
        }
    }
}

impl<S: PersistentStorage + 'static> KeyManager<S> {
    pub fn new(storage: Arc<S>, rng: Arc<dyn SecureRandom>) -> Self {
        Self {
            storage,
            rng,
            passphrase: None,
            kdf_iterations: PBKDF2_ITERATIONS,
            state: Arc::new(RwLock::new(KeyState::Empty)),
            busy: Arc::new(Mutex::new(())),
        }
    }

    /// Seal the private key at rest under `passphrase`.
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(Arc::new(Zeroizing::new(passphrase.into())));
        self
    }

    /// PBKDF2 iteration count for newly sealed records.
    pub fn with_kdf_iterations(mut self, iterations: u32) -> Self {
        self.kdf_iterations = iterations;
        self
    }

    /// Build a manager and load whatever keypair is already persisted.
    pub async fn open(storage: Arc<S>, rng: Arc<dyn SecureRandom>) -> Result<Self> {
        let manager = Self::new(storage, rng);
        manager.load().await?;
        Ok(manager)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, KeyState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, KeyState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, operation: &str) -> Result<OwnedMutexGuard<()>> {
        self.busy.clone().try_lock_owned().map_err(|_| {
            ChimalliError::KeyGeneration(format!(
                "cannot {operation} while another key operation is in progress"
            ))
        })
    }

    fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref().map(|p| p.as_str())
    }

    /// Refresh the in-memory keypair from durable storage.
    pub async fn load(&self) -> Result<KeyStatus> {
        let _busy = self.begin("reload")?;
        let stored = self.retrieve().await?;

        let mut state = self.write_state();
        *state = match stored {
            Some(keypair) => {
                debug!("Loaded keypair {}", keypair.public_key.fingerprint());
                KeyState::Ready(keypair)
            }
            None => KeyState::Empty,
        };
        Ok(status_of(&state))
    }

    pub fn status(&self) -> KeyStatus {
        status_of(&self.read_state())
    }

    /// True iff a complete keypair is loaded and no generation is running.
    pub fn has_keypair(&self) -> bool {
        self.status() == KeyStatus::Ready
    }

    /// The loaded keypair, or `None` when empty or generating.
    pub fn keypair(&self) -> Option<Keypair> {
        match &*self.read_state() {
            KeyState::Ready(keypair) => Some(keypair.clone()),
            _ => None,
        }
    }

    pub fn public_key(&self) -> Option<PublicKey> {
        self.keypair().map(|kp| kp.public_key)
    }

    /// Start generating a replacement keypair and return immediately.
    ///
    /// Must be called from within a tokio runtime. The CPU-bound work runs
    /// on the blocking pool; the returned handle resolves once the keypair
    /// is persisted. On failure the previous keypair (or emptiness) is kept.
    pub fn generate_keys(&self, bits: u16) -> Result<KeyGeneration> {
        validate_key_bits(bits)?;
        let busy = self.begin("generate keys")?;

        {
            let mut state = self.write_state();
            let previous = match std::mem::replace(&mut *state, KeyState::Empty) {
                KeyState::Ready(keypair) => Some(keypair),
                KeyState::Generating { previous } => previous,
                KeyState::Empty => None,
            };
            *state = KeyState::Generating { previous };
        }

        info!("Generating {bits}-bit keypair in the background");
        let manager = self.clone();
        let handle = tokio::spawn(async move {
            let result = manager.run_generation(bits).await;
            drop(busy);
            result
        });
        Ok(KeyGeneration { handle })
    }

    async fn run_generation(self, bits: u16) -> Result<PublicKey> {
        let started = Instant::now();
        let rng = self.rng.clone();

        let generated = match tokio::task::spawn_blocking(move || Keypair::generate(bits, rng.as_ref())).await {
            Ok(result) => result,
            Err(e) => Err(ChimalliError::KeyGeneration(format!("generation task failed: {e}"))),
        };

        let outcome = match generated {
            Ok(keypair) => self.write_record(&keypair).await.map(|()| keypair),
            Err(e) => Err(e),
        };

        let mut state = self.write_state();
        let previous = match std::mem::replace(&mut *state, KeyState::Empty) {
            KeyState::Generating { previous } => previous,
            KeyState::Ready(keypair) => Some(keypair),
            KeyState::Empty => None,
        };

        match outcome {
            Ok(keypair) => {
                let public_key = keypair.public_key.clone();
                info!(
                    "Keypair {} ready after {:?}",
                    public_key.fingerprint(),
                    started.elapsed()
                );
                *state = KeyState::Ready(keypair);
                Ok(public_key)
            }
            Err(e) => {
                warn!("Key generation failed, keeping previous state: {e}");
                *state = match previous {
                    Some(keypair) => KeyState::Ready(keypair),
                    None => KeyState::Empty,
                };
                Err(e)
            }
        }
    }

    async fn write_record(&self, keypair: &Keypair) -> Result<()> {
        let record = KeypairRecord::new(keypair, self.passphrase(), self.kdf_iterations, self.rng.as_ref())?;
        self.storage.set(KEY_KEYPAIR, &record.to_bytes()?).await?;
        debug!(
            "Persisted keypair {} (sealed: {})",
            keypair.public_key.fingerprint(),
            record.is_sealed()
        );
        Ok(())
    }

    /// Durably store `keypair` and make it the loaded keypair.
    pub async fn persist(&self, keypair: &Keypair) -> Result<()> {
        let _busy = self.begin("persist")?;
        self.write_record(keypair).await?;
        *self.write_state() = KeyState::Ready(keypair.clone());
        Ok(())
    }

    /// Read the persisted keypair, or `None` if nothing is stored.
    pub async fn retrieve(&self) -> Result<Option<Keypair>> {
        match self.storage.get(KEY_KEYPAIR).await? {
            Some(bytes) => {
                let record = KeypairRecord::from_bytes(&bytes)?;
                Ok(Some(record.open(self.passphrase())?))
            }
            None => Ok(None),
        }
    }

    /// Forget the keypair, both in memory and in durable storage.
    pub async fn clear(&self) -> Result<()> {
        let _busy = self.begin("clear")?;
        self.storage.delete(KEY_KEYPAIR).await?;
        *self.write_state() = KeyState::Empty;
        info!("Keypair cleared");
        Ok(())
    }

    /// Encrypt for an arbitrary recipient using this manager's randomness.
    pub fn encrypt(&self, plaintext: &[u8], recipient: &PublicKey) -> Result<Vec<u8>> {
        encrypt(plaintext, recipient, self.rng.as_ref())
    }

    /// Decrypt with the loaded private key.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let keypair = self
            .keypair()
            .ok_or_else(|| ChimalliError::NotFound("no keypair loaded".to_string()))?;
        decrypt(ciphertext, &keypair.private_key)
    }

    pub fn rng(&self) -> &dyn SecureRandom {
        self.rng.as_ref()
    }
}

fn status_of(state: &KeyState) -> KeyStatus {
    match state {
        KeyState::Empty => KeyStatus::Empty,
        KeyState::Generating { .. } => KeyStatus::Generating,
        KeyState::Ready(_) => KeyStatus::Ready,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::config::SharingConfig;
    use crate::pipeline::{protect_with_config, reveal};
    use crate::sharing::{combine, split};
    use crate::storage::memory::MemoryStorage;
    use crate::test_support::{FailingRandom, SlowRandom, TestRandom};

    /// Key-value store whose deletes take a while to land.
    #[derive(Default)]
    struct SlowDeleteStorage {
        inner: MemoryStorage,
    }

    #[async_trait]
    impl PersistentStorage for SlowDeleteStorage {
        async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
            self.inner.set(key, value).await
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn delete(&self, key: &str) -> Result<()> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.inner.delete(key).await
        }

        async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
            self.inner.list_keys(prefix).await
        }
    }

    fn manager(storage: &Arc<MemoryStorage>) -> KeyManager<MemoryStorage> {
        KeyManager::new(storage.clone(), Arc::new(TestRandom))
    }

    #[tokio::test]
    async fn test_starts_empty() {
        let storage = Arc::new(MemoryStorage::new());
        let km = KeyManager::open(storage, Arc::new(TestRandom)).await.unwrap();
        assert_eq!(km.status(), KeyStatus::Empty);
        assert!(!km.has_keypair());
        assert!(km.keypair().is_none());
        assert!(km.retrieve().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_generate_runs_in_background_then_persists() {
        let storage = Arc::new(MemoryStorage::new());
        let km = manager(&storage);

        let generation = km.generate_keys(256).unwrap();
        // The spawned task has not been polled yet on this single-threaded runtime.
        assert_eq!(km.status(), KeyStatus::Generating);
        assert!(!km.has_keypair());
        assert!(km.keypair().is_none());
        assert!(km.retrieve().await.unwrap().is_none());

        let public_key = generation.wait().await.unwrap();
        assert!(km.has_keypair());
        assert_eq!(km.public_key(), Some(public_key.clone()));

        let reopened = KeyManager::open(storage, Arc::new(TestRandom)).await.unwrap();
        assert_eq!(reopened.public_key(), Some(public_key));
    }

    #[tokio::test]
    async fn test_second_generation_is_rejected_while_running() {
        let storage = Arc::new(MemoryStorage::new());
        let km = manager(&storage);

        let first = km.generate_keys(256).unwrap();
        assert!(matches!(km.generate_keys(256), Err(ChimalliError::KeyGeneration(_))));
        assert!(matches!(km.clear().await, Err(ChimalliError::KeyGeneration(_))));
        first.wait().await.unwrap();

        assert!(km.generate_keys(256).unwrap().wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_unsupported_strength_is_rejected_up_front() {
        let storage = Arc::new(MemoryStorage::new());
        let km = manager(&storage);
        assert!(matches!(km.generate_keys(1024), Err(ChimalliError::InvalidParameters(_))));
        assert_eq!(km.status(), KeyStatus::Empty);
    }

    #[tokio::test]
    async fn test_failed_generation_keeps_prior_keypair() {
        let storage = Arc::new(MemoryStorage::new());
        let prior = Keypair::generate(256, &TestRandom).unwrap();
        manager(&storage).persist(&prior).await.unwrap();

        let km = KeyManager::open(storage.clone(), Arc::new(FailingRandom)).await.unwrap();
        assert!(km.has_keypair());

        let result = km.generate_keys(256).unwrap().wait().await;
        assert!(matches!(result, Err(ChimalliError::KeyGeneration(_))));

        assert_eq!(km.public_key(), Some(prior.public_key.clone()));
        let persisted = km.retrieve().await.unwrap().unwrap();
        assert_eq!(persisted.public_key, prior.public_key);
        assert_eq!(persisted.private_key.as_bytes(), prior.private_key.as_bytes());
    }

    #[tokio::test]
    async fn test_failed_generation_from_empty_stays_empty() {
        let storage = Arc::new(MemoryStorage::new());
        let km = KeyManager::new(storage.clone(), Arc::new(FailingRandom));

        assert!(km.generate_keys(256).unwrap().wait().await.is_err());
        assert_eq!(km.status(), KeyStatus::Empty);
        assert!(storage.get(KEY_KEYPAIR).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_storage_outage_during_generation_keeps_prior_keypair() {
        let storage = Arc::new(MemoryStorage::new());
        let km = manager(&storage);
        let prior = Keypair::generate(256, &TestRandom).unwrap();
        km.persist(&prior).await.unwrap();

        storage.set_unavailable(true);
        let result = km.generate_keys(256).unwrap().wait().await;
        assert!(matches!(result, Err(ChimalliError::Storage(_))));
        assert_eq!(km.public_key(), Some(prior.public_key.clone()));

        storage.set_unavailable(false);
        assert_eq!(km.retrieve().await.unwrap().unwrap().public_key, prior.public_key);
    }

    #[tokio::test]
    async fn test_sealed_keypair_requires_passphrase() {
        let storage = Arc::new(MemoryStorage::new());
        let km = manager(&storage)
            .with_passphrase("pochteca")
            .with_kdf_iterations(1_000);
        let public_key = km.generate_keys(256).unwrap().wait().await.unwrap();

        let with_pass = KeyManager::new(storage.clone(), Arc::new(TestRandom)).with_passphrase("pochteca");
        with_pass.load().await.unwrap();
        assert_eq!(with_pass.public_key(), Some(public_key));

        let without = KeyManager::new(storage.clone(), Arc::new(TestRandom));
        assert!(matches!(without.load().await, Err(ChimalliError::Decryption(_))));
        assert_eq!(without.status(), KeyStatus::Empty);
    }

    #[tokio::test]
    async fn test_encrypt_decrypt_through_manager() {
        let storage = Arc::new(MemoryStorage::new());
        let km = manager(&storage);
        assert!(matches!(km.decrypt(b"anything"), Err(ChimalliError::NotFound(_))));

        let public_key = km.generate_keys(256).unwrap().wait().await.unwrap();
        let ciphertext = km.encrypt(b"keeper note", &public_key).unwrap();
        assert_eq!(km.decrypt(&ciphertext).unwrap(), b"keeper note");
    }

    #[tokio::test]
    async fn test_clear_removes_persisted_keypair() {
        let storage = Arc::new(MemoryStorage::new());
        let km = manager(&storage);
        km.generate_keys(256).unwrap().wait().await.unwrap();

        km.clear().await.unwrap();
        assert_eq!(km.status(), KeyStatus::Empty);
        assert!(km.retrieve().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_generation_is_rejected_while_clear_is_pending() {
        let storage = Arc::new(SlowDeleteStorage::default());
        let km = KeyManager::new(storage.clone(), Arc::new(TestRandom));
        km.generate_keys(256).unwrap().wait().await.unwrap();

        let clearing = tokio::spawn({
            let km = km.clone();
            async move { km.clear().await }
        });
        // Let the clear reach its slow delete.
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(matches!(km.generate_keys(256), Err(ChimalliError::KeyGeneration(_))));
        let prior = Keypair::generate(256, &TestRandom).unwrap();
        assert!(matches!(km.persist(&prior).await, Err(ChimalliError::KeyGeneration(_))));

        clearing.await.unwrap().unwrap();
        assert_eq!(km.status(), KeyStatus::Empty);
        assert!(km.retrieve().await.unwrap().is_none());

        // Once the clear has landed a fresh generation goes through alone.
        let generation = km.generate_keys(256).unwrap();
        assert!(matches!(km.generate_keys(256), Err(ChimalliError::KeyGeneration(_))));
        let public_key = generation.wait().await.unwrap();
        assert_eq!(km.public_key(), Some(public_key));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_clear_and_persist_wait_out_a_running_generation() {
        let storage = Arc::new(MemoryStorage::new());
        let km = KeyManager::new(storage.clone(), Arc::new(SlowRandom::new(Duration::from_millis(200))));

        let generation = km.generate_keys(256).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let other = Keypair::generate(256, &TestRandom).unwrap();
        assert!(matches!(km.clear().await, Err(ChimalliError::KeyGeneration(_))));
        assert!(matches!(km.persist(&other).await, Err(ChimalliError::KeyGeneration(_))));
        assert!(matches!(km.load().await, Err(ChimalliError::KeyGeneration(_))));
        assert_eq!(km.status(), KeyStatus::Generating);
        assert!(!generation.is_finished());

        let public_key = generation.wait().await.unwrap();
        assert_eq!(km.public_key(), Some(public_key.clone()));
        assert_eq!(km.retrieve().await.unwrap().unwrap().public_key, public_key);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sharing_proceeds_while_generation_runs() {
        let storage = Arc::new(MemoryStorage::new());
        let km = KeyManager::new(storage, Arc::new(SlowRandom::new(Duration::from_millis(200))));
        let recipient = Keypair::generate(256, &TestRandom).unwrap();

        let generation = km.generate_keys(256).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let set = split(b"aztec gold", 3, 2, &TestRandom).unwrap();
        assert_eq!(combine(&set.shares[1..]).unwrap(), b"aztec gold");

        let sealed = protect_with_config(
            b"aztec gold",
            &SharingConfig::default(),
            &recipient.public_key,
            &TestRandom,
        )
        .unwrap();
        assert_eq!(reveal(&sealed[..2], &recipient.private_key).unwrap(), b"aztec gold");

        assert_eq!(km.status(), KeyStatus::Generating);
        assert!(km.keypair().is_none());
        assert!(!generation.is_finished());

        generation.wait().await.unwrap();
        assert!(km.has_keypair());
    }
}
