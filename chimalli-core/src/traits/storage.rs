use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ChimalliError;

/// SHA-256 address of a blob held by a [`ContentStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentRef(pub [u8; 32]);

impl ContentRef {
    pub fn for_data(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, ChimalliError> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| ChimalliError::InvalidParameters(format!("invalid content reference: {e}")))?;
        let hash: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            ChimalliError::InvalidParameters(format!(
                "content reference must be 32 bytes, got {}",
                v.len()
            ))
        })?;
        Ok(Self(hash))
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Content-addressed blob storage for encrypted shares.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn put(&self, data: &[u8]) -> Result<ContentRef, ChimalliError>;
    async fn get(&self, reference: &ContentRef) -> Result<Vec<u8>, ChimalliError>;
}

/// Durable key-value storage scoped to the local user/device.
#[async_trait]
pub trait PersistentStorage: Send + Sync {
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), ChimalliError>;
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ChimalliError>;
    async fn delete(&self, key: &str) -> Result<(), ChimalliError>;
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, ChimalliError>;
}
