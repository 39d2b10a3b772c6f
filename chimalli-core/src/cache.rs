//! Share set cache in the durable key-value store.
//!
//! Mirrors what a front end keeps between sessions: the last threshold and
//! piece count the user chose, and the last share set produced.

use std::sync::Arc;

use tracing::debug;

use crate::config::SharingConfig;
use crate::constants::{KEY_AMOUNT_OF_PIECES, KEY_PIECES, KEY_THRESHOLD};
use crate::error::{ChimalliError, Result};
use crate::sharing::ShareSet;
use crate::traits::storage::PersistentStorage;

pub struct ShareCache<S> {
    storage: Arc<S>,
}

impl<S: PersistentStorage> ShareCache<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Remember `set` and the configuration that produced it.
    ///
    /// The share set is written last and carries its own threshold, so a
    /// partially applied save never yields a mismatched set on `load`.
    pub async fn save(&self, set: &ShareSet) -> Result<()> {
        let total = u8::try_from(set.total()).map_err(|_| {
            ChimalliError::InvalidParameters(format!("share set too large: {}", set.total()))
        })?;
        self.save_config(set.threshold, total).await?;

        let bytes = bincode::serialize(set).map_err(|e| ChimalliError::Serialization(e.to_string()))?;
        self.storage.set(KEY_PIECES, &bytes).await?;

        debug!("Cached {} shares (threshold {})", set.total(), set.threshold);
        Ok(())
    }

    /// Remember the user's threshold and piece count without a share set.
    pub async fn save_config(&self, threshold: u8, total_pieces: u8) -> Result<()> {
        self.storage.set(KEY_THRESHOLD, threshold.to_string().as_bytes()).await?;
        self.storage.set(KEY_AMOUNT_OF_PIECES, total_pieces.to_string().as_bytes()).await
    }

    pub async fn load(&self) -> Result<Option<ShareSet>> {
        match self.storage.get(KEY_PIECES).await? {
            Some(bytes) => bincode::deserialize(&bytes)
                .map(Some)
                .map_err(|e| ChimalliError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// Cached threshold and piece count, falling back to the defaults.
    pub async fn load_config(&self) -> Result<SharingConfig> {
        let mut config = SharingConfig::default();
        if let Some(threshold) = self.read_number(KEY_THRESHOLD).await? {
            config.threshold = threshold;
        }
        if let Some(total) = self.read_number(KEY_AMOUNT_OF_PIECES).await? {
            config.total_pieces = total;
        }
        Ok(config)
    }

    pub async fn clear(&self) -> Result<()> {
        for key in [KEY_PIECES, KEY_THRESHOLD, KEY_AMOUNT_OF_PIECES] {
            self.storage.delete(key).await?;
        }
        Ok(())
    }

    async fn read_number(&self, key: &str) -> Result<Option<u8>> {
        let Some(bytes) = self.storage.get(key).await? else {
            return Ok(None);
        };
        let text = String::from_utf8(bytes)
            .map_err(|e| ChimalliError::Serialization(format!("{key}: {e}")))?;
        text.trim()
            .parse::<u8>()
            .map(Some)
            .map_err(|e| ChimalliError::Serialization(format!("{key}: {e}")))
    }
}
