use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::debug;

use chimalli_core::error::ChimalliError;
use chimalli_core::traits::storage::PersistentStorage;

/// Persistent key-value metadata storage backed by SQLite.
///
/// Uses a single `metadata(key TEXT PRIMARY KEY, value BLOB)` table.
/// Synchronous rusqlite calls are wrapped in `tokio::task::spawn_blocking`.
pub struct SqliteMeta {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMeta {
    /// Open (or create) the SQLite database at the given path.
    pub fn open(db_path: &Path) -> Result<Self, ChimalliError> {
        let conn = Connection::open(db_path)
            .map_err(|e| ChimalliError::Storage(format!("open SQLite DB failed: {e}")))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS metadata (
                key   TEXT PRIMARY KEY,
                value BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| ChimalliError::Storage(format!("create metadata table failed: {e}")))?;

        // Enable WAL mode for better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| ChimalliError::Storage(format!("set WAL mode failed: {e}")))?;

        debug!("Opened SQLite metadata DB at {}", db_path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl PersistentStorage for SqliteMeta {
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), ChimalliError> {
        let conn = self.conn.clone();
        let key = key.to_string();
        let value = value.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )
            .map_err(|e| ChimalliError::Storage(format!("sqlite set failed: {e}")))?;

            debug!("Set key '{}' ({} bytes)", key, value.len());
            Ok(())
        })
        .await
        .map_err(|e| ChimalliError::Storage(format!("spawn_blocking failed: {e}")))?
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ChimalliError> {
        let conn = self.conn.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn
                .prepare("SELECT value FROM metadata WHERE key = ?1")
                .map_err(|e| ChimalliError::Storage(format!("sqlite prepare failed: {e}")))?;

            let result: Result<Vec<u8>, _> =
                stmt.query_row(rusqlite::params![key], |row| row.get(0));

            match result {
                Ok(value) => Ok(Some(value)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(ChimalliError::Storage(format!("sqlite get failed: {e}"))),
            }
        })
        .await
        .map_err(|e| ChimalliError::Storage(format!("spawn_blocking failed: {e}")))?
    }

    async fn delete(&self, key: &str) -> Result<(), ChimalliError> {
        let conn = self.conn.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "DELETE FROM metadata WHERE key = ?1",
                rusqlite::params![key],
            )
            .map_err(|e| ChimalliError::Storage(format!("sqlite delete failed: {e}")))?;

            debug!("Deleted key '{}'", key);
            Ok(())
        })
        .await
        .map_err(|e| ChimalliError::Storage(format!("spawn_blocking failed: {e}")))?
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, ChimalliError> {
        let conn = self.conn.clone();
        let prefix = prefix.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            // substr avoids LIKE treating '_' and '%' in the prefix as wildcards.
            let mut stmt = conn
                .prepare("SELECT key FROM metadata WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key")
                .map_err(|e| ChimalliError::Storage(format!("sqlite prepare failed: {e}")))?;

            let keys: Vec<String> = stmt
                .query_map(rusqlite::params![prefix], |row| row.get(0))
                .map_err(|e| ChimalliError::Storage(format!("sqlite query failed: {e}")))?
                .collect::<Result<Vec<String>, _>>()
                .map_err(|e| ChimalliError::Storage(format!("sqlite collect failed: {e}")))?;

            debug!("Listed {} keys with prefix '{}'", keys.len(), prefix);
            Ok(keys)
        })
        .await
        .map_err(|e| ChimalliError::Storage(format!("spawn_blocking failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let meta = SqliteMeta::open(&dir.path().join("meta.db")).unwrap();

        meta.set("chimalli:threshold", b"2").await.unwrap();
        assert_eq!(meta.get("chimalli:threshold").await.unwrap(), Some(b"2".to_vec()));

        meta.set("chimalli:threshold", b"3").await.unwrap();
        assert_eq!(meta.get("chimalli:threshold").await.unwrap(), Some(b"3".to_vec()));

        meta.delete("chimalli:threshold").await.unwrap();
        assert!(meta.get("chimalli:threshold").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.db");
        {
            let meta = SqliteMeta::open(&path).unwrap();
            meta.set("chimalli:keypair", &[1, 2, 3]).await.unwrap();
        }
        let meta = SqliteMeta::open(&path).unwrap();
        assert_eq!(meta.get("chimalli:keypair").await.unwrap(), Some(vec![1, 2, 3]));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_keys_prefix_is_literal() {
        let dir = tempfile::tempdir().unwrap();
        let meta = SqliteMeta::open(&dir.path().join("meta.db")).unwrap();

        meta.set("chimalli:pieces", b"a").await.unwrap();
        meta.set("chimalli:threshold", b"b").await.unwrap();
        meta.set("chimalliXpieces", b"c").await.unwrap();

        let keys = meta.list_keys("chimalli:").await.unwrap();
        assert_eq!(keys, vec!["chimalli:pieces", "chimalli:threshold"]);
    }
}
