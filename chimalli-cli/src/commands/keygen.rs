use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use super::Workspace;
use crate::config::Config;

/// Generate a fresh keypair in the background, replacing any existing one.
pub async fn run_keygen(config: Config, bits: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::open(config).await?;
    let bits = bits.unwrap_or(workspace.config.key_bits);

    if let Some(existing) = workspace.keys.public_key() {
        info!("Replacing keypair {}", existing.fingerprint());
    }

    let generation = workspace.keys.generate_keys(bits)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .map_err(|e| format!("progress bar template error: {e}"))?,
    );
    pb.set_message(format!("Generating {bits}-bit keypair..."));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = generation.wait().await;
    pb.finish_and_clear();
    let public_key = result?;

    println!("Keypair generated.");
    println!("Fingerprint: {}", public_key.fingerprint());
    println!("Public key:  {}", public_key.to_hex());
    if workspace.config.passphrase.is_some() {
        println!("Private key sealed with your passphrase.");
    }

    Ok(())
}
