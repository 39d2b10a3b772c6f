use tracing::info;

use chimalli_core::keys::PublicKey;

use super::Workspace;
use crate::config::Config;

pub struct ProtectOptions {
    /// Hex public key; the local key when absent.
    pub recipient: Option<String>,
    /// When non-empty, one share goes to each keeper via the registry.
    pub keepers: Vec<String>,
    pub pieces: Option<u8>,
    pub threshold: Option<u8>,
}

/// Split a secret, seal every share to a recipient and store the blobs.
pub async fn run_protect(
    config: Config,
    secret: &str,
    options: ProtectOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::open(config).await?;

    let recipient = match options.recipient.as_deref() {
        Some(hex_str) => PublicKey::from_hex(hex_str)?,
        None => workspace.require_keypair()?.public_key,
    };

    if !options.keepers.is_empty() {
        return protect_with_keepers(&workspace, secret, &recipient, &options).await;
    }

    let remembered = workspace.cache.load_config().await?;
    let sharing = workspace.config.sharing(options.pieces, options.threshold, remembered);

    let stored = workspace
        .vault
        .deposit(secret.as_bytes(), &sharing, &recipient, workspace.rng.as_ref())
        .await?;
    workspace
        .cache
        .save_config(sharing.threshold, sharing.total_pieces)
        .await?;

    info!("Protected secret for {}", recipient.fingerprint());

    println!(
        "Protected for {} ({} shares, threshold {}):",
        recipient.fingerprint(),
        stored.len(),
        sharing.threshold
    );
    for share in &stored {
        println!("  [{}] {}", share.index, share.reference);
    }

    Ok(())
}

async fn protect_with_keepers(
    workspace: &Workspace,
    secret: &str,
    recipient: &PublicKey,
    options: &ProtectOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(pieces) = options.pieces {
        if usize::from(pieces) != options.keepers.len() {
            return Err(format!(
                "--pieces {pieces} does not match the {} keepers given",
                options.keepers.len()
            )
            .into());
        }
    }

    let remembered = workspace.cache.load_config().await?;
    let threshold = options
        .threshold
        .or(workspace.config.threshold)
        .unwrap_or(remembered.threshold);

    let entries = workspace
        .vault
        .deposit_for(
            &workspace.config.account,
            &options.keepers,
            threshold,
            recipient,
            secret.as_bytes(),
            workspace.rng.as_ref(),
        )
        .await?;

    info!("Protected secret for {} with {} keepers", recipient.fingerprint(), entries.len());

    println!(
        "Protected for {} ({} keepers, threshold {}):",
        recipient.fingerprint(),
        entries.len(),
        threshold
    );
    for entry in &entries {
        println!("  {} -> {}", entry.keeper, entry.reference);
    }
    println!("Reveal with any {threshold} of the entry references above.");

    Ok(())
}
