use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use chimalli_core::error::ChimalliError;
use chimalli_core::traits::storage::{ContentRef, ContentStore};

/// Content-addressed blob storage backed by the local filesystem.
///
/// Blobs are stored at `<home>/blobs/{hex_hash}` where `hex_hash` is the
/// lowercase hex encoding of the 32-byte SHA-256 hash.
pub struct LocalFs {
    blobs_dir: PathBuf,
}

impl LocalFs {
    /// Create a new LocalFs rooted at the given blobs directory.
    pub fn new(blobs_dir: &Path) -> Self {
        Self {
            blobs_dir: blobs_dir.to_path_buf(),
        }
    }

    /// Return the filesystem path for a given reference.
    fn blob_path(&self, reference: &ContentRef) -> PathBuf {
        self.blobs_dir.join(reference.to_hex())
    }
}

#[async_trait]
impl ContentStore for LocalFs {
    async fn put(&self, data: &[u8]) -> Result<ContentRef, ChimalliError> {
        let reference = ContentRef::for_data(data);
        let path = self.blob_path(&reference);

        fs::create_dir_all(&self.blobs_dir)
            .await
            .map_err(|e| ChimalliError::Storage(format!("create blobs dir failed: {e}")))?;

        // Write then rename so readers never see a partial blob.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, data)
            .await
            .map_err(|e| ChimalliError::Storage(format!("write blob failed: {e}")))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| ChimalliError::Storage(format!("rename blob failed: {e}")))?;

        debug!("Stored blob {} ({} bytes)", reference, data.len());
        Ok(reference)
    }

    async fn get(&self, reference: &ContentRef) -> Result<Vec<u8>, ChimalliError> {
        let path = self.blob_path(reference);

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ChimalliError::NotFound(format!("blob not found: {reference}")));
            }
            Err(e) => return Err(ChimalliError::Storage(format!("read blob failed: {e}"))),
        };

        if ContentRef::for_data(&data) != *reference {
            return Err(ChimalliError::Storage(format!("blob {reference} is corrupted")));
        }

        debug!("Retrieved blob {} ({} bytes)", reference, data.len());
        Ok(data)
    }
}
