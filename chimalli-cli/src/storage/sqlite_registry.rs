use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::debug;

use chimalli_core::error::ChimalliError;
use chimalli_core::storage::memory::derive_entry_reference;
use chimalli_core::traits::registry::{RegistryAdapter, RegistryEntry};
use chimalli_core::traits::storage::ContentRef;

/// Local stand-in for the keeper registry, kept in the same SQLite file
/// as the metadata table.
pub struct SqliteRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRegistry {
    pub fn open(db_path: &Path) -> Result<Self, ChimalliError> {
        let conn = Connection::open(db_path)
            .map_err(|e| ChimalliError::Registry(format!("open SQLite DB failed: {e}")))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS registry_entries (
                reference  TEXT PRIMARY KEY,
                owner      TEXT NOT NULL,
                keeper     TEXT NOT NULL,
                created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            )",
            [],
        )
        .map_err(|e| ChimalliError::Registry(format!("create registry table failed: {e}")))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS registry_shares (
                entry_reference TEXT NOT NULL REFERENCES registry_entries(reference),
                share           TEXT NOT NULL,
                PRIMARY KEY (entry_reference, share)
            )",
            [],
        )
        .map_err(|e| ChimalliError::Registry(format!("create registry shares table failed: {e}")))?;

        debug!("Opened SQLite registry at {}", db_path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl RegistryAdapter for SqliteRegistry {
    async fn list_entries(&self, account: &str) -> Result<Vec<RegistryEntry>, ChimalliError> {
        let conn = self.conn.clone();
        let account = account.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn
                .prepare(
                    "SELECT reference, owner, keeper FROM registry_entries
                     WHERE owner = ?1 ORDER BY rowid",
                )
                .map_err(|e| ChimalliError::Registry(format!("sqlite prepare failed: {e}")))?;

            let mut entries = stmt
                .query_map(rusqlite::params![account], |row| {
                    Ok(RegistryEntry {
                        reference: row.get(0)?,
                        owner: row.get(1)?,
                        keeper: row.get(2)?,
                        shares: Vec::new(),
                    })
                })
                .map_err(|e| ChimalliError::Registry(format!("sqlite query failed: {e}")))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ChimalliError::Registry(format!("sqlite collect failed: {e}")))?;

            for entry in &mut entries {
                entry.shares = load_shares(&conn, &entry.reference)?;
            }

            Ok(entries)
        })
        .await
        .map_err(|e| ChimalliError::Registry(format!("spawn_blocking failed: {e}")))?
    }

    async fn create_entry(&self, owner: &str, keeper: &str) -> Result<RegistryEntry, ChimalliError> {
        let conn = self.conn.clone();
        let owner = owner.to_string();
        let keeper = keeper.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM registry_entries", [], |row| row.get(0))
                .map_err(|e| ChimalliError::Registry(format!("sqlite count failed: {e}")))?;

            let entry = RegistryEntry {
                reference: derive_entry_reference(&owner, &keeper, count as u64),
                owner,
                keeper,
                shares: Vec::new(),
            };

            conn.execute(
                "INSERT INTO registry_entries (reference, owner, keeper) VALUES (?1, ?2, ?3)",
                rusqlite::params![entry.reference, entry.owner, entry.keeper],
            )
            .map_err(|e| ChimalliError::Registry(format!("sqlite insert failed: {e}")))?;

            debug!("Created registry entry {}", entry.reference);
            Ok(entry)
        })
        .await
        .map_err(|e| ChimalliError::Registry(format!("spawn_blocking failed: {e}")))?
    }

    async fn record_shares(
        &self,
        reference: &str,
        shares: &[ContentRef],
    ) -> Result<RegistryEntry, ChimalliError> {
        let conn = self.conn.clone();
        let reference = reference.to_string();
        let shares = shares.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            let tx = conn
                .transaction()
                .map_err(|e| ChimalliError::Registry(format!("sqlite begin failed: {e}")))?;

            let found: Result<(String, String), _> = tx.query_row(
                "SELECT owner, keeper FROM registry_entries WHERE reference = ?1",
                rusqlite::params![reference],
                |row| Ok((row.get(0)?, row.get(1)?)),
            );
            let (owner, keeper) = match found {
                Ok(pair) => pair,
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    return Err(ChimalliError::NotFound(format!(
                        "registry entry not found: {reference}"
                    )));
                }
                Err(e) => return Err(ChimalliError::Registry(format!("sqlite get failed: {e}"))),
            };

            for share in &shares {
                tx.execute(
                    "INSERT OR IGNORE INTO registry_shares (entry_reference, share) VALUES (?1, ?2)",
                    rusqlite::params![reference, share.to_hex()],
                )
                .map_err(|e| ChimalliError::Registry(format!("sqlite insert failed: {e}")))?;
            }
            tx.commit()
                .map_err(|e| ChimalliError::Registry(format!("sqlite commit failed: {e}")))?;

            let shares = load_shares(&conn, &reference)?;
            debug!("Entry {} now holds {} shares", reference, shares.len());
            Ok(RegistryEntry { reference, owner, keeper, shares })
        })
        .await
        .map_err(|e| ChimalliError::Registry(format!("spawn_blocking failed: {e}")))?
    }
}

fn load_shares(conn: &Connection, reference: &str) -> Result<Vec<ContentRef>, ChimalliError> {
    let mut stmt = conn
        .prepare("SELECT share FROM registry_shares WHERE entry_reference = ?1 ORDER BY rowid")
        .map_err(|e| ChimalliError::Registry(format!("sqlite prepare failed: {e}")))?;

    let hexes = stmt
        .query_map(rusqlite::params![reference], |row| row.get::<_, String>(0))
        .map_err(|e| ChimalliError::Registry(format!("sqlite query failed: {e}")))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ChimalliError::Registry(format!("sqlite collect failed: {e}")))?;

    hexes.iter().map(|h| ContentRef::from_hex(h)).collect()
}
