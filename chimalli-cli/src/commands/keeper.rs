use super::Workspace;
use crate::config::Config;

/// Register `keeper` as a share holder for the configured account.
pub async fn run_keeper_create(config: Config, keeper: &str) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::open(config).await?;
    let entry = workspace
        .vault
        .register_keeper(&workspace.config.account, keeper)
        .await?;
    println!("Keeper {} registered at {}", entry.keeper, entry.reference);
    Ok(())
}

pub async fn run_keeper_list(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::open(config).await?;
    let entries = workspace.vault.entries(&workspace.config.account).await?;

    if entries.is_empty() {
        println!("No keepers registered for {}.", workspace.config.account);
        return Ok(());
    }

    println!("{:<44} {:<24} SHARES", "REFERENCE", "KEEPER");
    println!("{}", "-".repeat(80));
    for entry in &entries {
        println!("{:<44} {:<24} {}", entry.reference, entry.keeper, entry.shares.len());
        for share in &entry.shares {
            println!("    {share}");
        }
    }
    println!();
    println!("{} keeper(s)", entries.len());
    Ok(())
}
