use chimalli_core::traits::storage::ContentRef;

use super::{display_secret, Workspace};
use crate::config::Config;

/// Fetch stored shares and reveal the secret with the local private key.
///
/// `0x`-prefixed arguments name registry entries of the configured account;
/// anything else is a share's content reference.
pub async fn run_reveal(config: Config, references: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::open(config).await?;
    let keypair = workspace.require_keypair()?;

    let (entry_refs, share_refs): (Vec<String>, Vec<String>) =
        references.iter().cloned().partition(|r| r.starts_with("0x"));

    let mut shares = share_refs
        .iter()
        .map(|r| ContentRef::from_hex(r))
        .collect::<Result<Vec<_>, _>>()?;
    if !entry_refs.is_empty() {
        for held in workspace
            .vault
            .held_shares(&workspace.config.account, &entry_refs)
            .await?
        {
            if !shares.contains(&held) {
                shares.push(held);
            }
        }
    }

    let secret = workspace
        .vault
        .recover(&shares, &keypair.private_key)
        .await?;
    println!("{}", display_secret(&secret));
    Ok(())
}
