use super::Workspace;
use crate::config::Config;

/// Print the local public key so others can protect shares for it.
pub async fn run_pubkey(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::open(config).await?;
    let keypair = workspace.require_keypair()?;
    println!("{}", keypair.public_key.to_hex());
    Ok(())
}
