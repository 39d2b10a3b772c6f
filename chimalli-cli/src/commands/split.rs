use tracing::info;

use chimalli_core::sharing::split;

use super::Workspace;
use crate::config::Config;

/// Split a secret into plaintext shares and remember them locally.
pub async fn run_split(
    config: Config,
    secret: &str,
    pieces: Option<u8>,
    threshold: Option<u8>,
) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::open(config).await?;
    let remembered = workspace.cache.load_config().await?;
    let sharing = workspace.config.sharing(pieces, threshold, remembered);

    let set = split(
        secret.as_bytes(),
        sharing.total_pieces,
        sharing.threshold,
        workspace.rng.as_ref(),
    )?;
    workspace.cache.save(&set).await?;

    info!("Split secret into {} shares (threshold {})", set.total(), set.threshold);

    println!("{} shares, any {} recover the secret:", set.total(), set.threshold);
    for share in &set.shares {
        println!("  {}", share.to_hex());
    }

    Ok(())
}
