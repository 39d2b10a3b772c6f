//! CLI command implementations (init, keygen, pubkey, split, combine,
//! protect, reveal, keeper, status).

pub mod init;
pub mod keygen;
pub mod pubkey;
pub mod split;
pub mod combine;
pub mod protect;
pub mod reveal;
pub mod keeper;
pub mod status;

use std::sync::Arc;

use chimalli_core::cache::ShareCache;
use chimalli_core::keys::{KeyManager, Keypair};
use chimalli_core::traits::random::SecureRandom;
use chimalli_core::vault::ShareVault;

use crate::config::Config;
use crate::platform::NativeRandom;
use crate::storage::{LocalFs, SqliteMeta, SqliteRegistry};

/// Everything a command needs, opened from an initialized home directory.
pub struct Workspace {
    pub config: Config,
    pub keys: KeyManager<SqliteMeta>,
    pub cache: ShareCache<SqliteMeta>,
    pub vault: ShareVault<LocalFs, SqliteRegistry>,
    pub rng: Arc<dyn SecureRandom>,
}

impl Workspace {
    pub async fn open(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        if !config.home.exists() {
            return Err(format!(
                "No Chimalli home found at {}. Run `chimalli init` first.",
                config.home.display()
            )
            .into());
        }

        let db_path = config.meta_db_path();
        let meta = Arc::new(SqliteMeta::open(&db_path)?);
        let registry = Arc::new(SqliteRegistry::open(&db_path)?);
        let content = Arc::new(LocalFs::new(&config.blobs_dir()));
        let rng: Arc<dyn SecureRandom> = Arc::new(NativeRandom::new());

        let mut keys = KeyManager::new(meta.clone(), rng.clone());
        if let Some(passphrase) = &config.passphrase {
            keys = keys.with_passphrase(passphrase.clone());
        }
        keys.load().await?;

        Ok(Self {
            config,
            keys,
            cache: ShareCache::new(meta),
            vault: ShareVault::new(content, registry),
            rng,
        })
    }

    /// The loaded keypair, or a hint to run `keygen`.
    pub fn require_keypair(&self) -> Result<Keypair, Box<dyn std::error::Error>> {
        self.keys
            .keypair()
            .ok_or_else(|| "No keypair found. Run `chimalli keygen` first.".into())
    }
}

/// Render a recovered secret as text when it is UTF-8, hex otherwise.
pub fn display_secret(secret: &[u8]) -> String {
    match std::str::from_utf8(secret) {
        Ok(text) => text.to_string(),
        Err(_) => format!("0x{}", hex::encode(secret)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_secret() {
        assert_eq!(display_secret(b"aztec gold"), "aztec gold");
        assert_eq!(display_secret(&[0xff, 0x00]), "0xff00");
    }
}
