use tracing::info;

use chimalli_core::keys::KeyStatus;

use super::Workspace;
use crate::config::Config;

/// Show key state, the remembered share configuration and registry size.
pub async fn run_status(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::open(config).await?;
    let config = &workspace.config;

    println!("Chimalli Status");
    println!("===============");
    println!("  Home:    {}", config.home.display());
    println!("  Account: {}", config.account);

    println!();
    match workspace.keys.status() {
        KeyStatus::Ready => {
            if let Some(public_key) = workspace.keys.public_key() {
                println!("Keypair: ready");
                println!("  Fingerprint: {}", public_key.fingerprint());
            }
        }
        KeyStatus::Generating => println!("Keypair: generating"),
        KeyStatus::Empty => println!("Keypair: none (run `chimalli keygen`)"),
    }
    println!(
        "  Sealed:      {}",
        if config.passphrase.is_some() { "yes" } else { "no" }
    );

    println!();
    let remembered = workspace.cache.load_config().await?;
    println!("Sharing:");
    println!("  Threshold: {}", remembered.threshold);
    println!("  Pieces:    {}", remembered.total_pieces);
    match workspace.cache.load().await? {
        Some(set) => println!("  Cached:    {} shares", set.total()),
        None => println!("  Cached:    (none)"),
    }

    println!();
    let entries = workspace.vault.entries(&config.account).await?;
    let held: usize = entries.iter().map(|e| e.shares.len()).sum();
    println!("Registry: {} keeper(s), {} share(s) held", entries.len(), held);

    info!("Status displayed");
    Ok(())
}
