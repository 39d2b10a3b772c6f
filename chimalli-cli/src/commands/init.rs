use tracing::info;

use crate::config::Config;
use crate::storage::{SqliteMeta, SqliteRegistry};

/// Create the home directory, the blob directory and the metadata DB.
pub async fn run_init(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if config.home.exists() {
        return Err(format!(
            "Chimalli home already initialized ({} exists)",
            config.home.display()
        )
        .into());
    }

    info!("Initializing Chimalli home at {}", config.home.display());

    tokio::fs::create_dir_all(config.blobs_dir())
        .await
        .map_err(|e| format!("failed to create {}: {e}", config.blobs_dir().display()))?;

    let db_path = config.meta_db_path();
    let _meta = SqliteMeta::open(&db_path)?;
    let _registry = SqliteRegistry::open(&db_path)?;

    println!("Chimalli home initialized at {}", config.home.display());
    println!("Account: {}", config.account);
    println!("Next: run `chimalli keygen` to create your keypair.");

    Ok(())
}
