mod commands;
mod config;
mod platform;
mod storage;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::Config;

#[derive(Parser)]
#[command(name = "chimalli", about = "Threshold secret sharing with encrypted shares")]
struct Cli {
    /// Home directory (overrides CHIMALLI_HOME)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Prompt for the passphrase that seals the private key
    #[arg(long, global = true)]
    ask_passphrase: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new Chimalli home directory
    Init,

    /// Generate a new keypair in the background, replacing the current one
    Keygen {
        /// Key strength in bits (defaults to CHIMALLI_KEY_BITS or 256)
        #[arg(long)]
        bits: Option<u16>,
    },

    /// Print the local public key
    Pubkey,

    /// Split a secret into plaintext shares
    Split {
        secret: String,

        /// Number of shares to produce
        #[arg(long)]
        pieces: Option<u8>,

        /// Number of shares needed to recover the secret
        #[arg(long)]
        threshold: Option<u8>,
    },

    /// Recover a secret from hex-encoded shares
    Combine {
        #[arg(required = true)]
        shares: Vec<String>,
    },

    /// Split a secret, encrypt each share and store it
    Protect {
        secret: String,

        /// Recipient public key (hex). Defaults to the local key.
        #[arg(long)]
        recipient: Option<String>,

        /// Leave one share with each keeper and record it in the registry
        /// (repeatable; the number of keepers sets the number of pieces)
        #[arg(long = "keeper")]
        keepers: Vec<String>,

        #[arg(long)]
        pieces: Option<u8>,

        #[arg(long)]
        threshold: Option<u8>,
    },

    /// Fetch stored shares and decrypt the secret. Accepts share
    /// references and registry entry references (`0x...`)
    Reveal {
        #[arg(required = true)]
        references: Vec<String>,
    },

    /// Manage registered keepers
    Keeper {
        #[command(subcommand)]
        action: KeeperAction,
    },

    /// Show the current status of the Chimalli home
    Status,
}

#[derive(Subcommand)]
enum KeeperAction {
    /// Register a keeper for the configured account
    Create { keeper: String },

    /// List keepers registered for the configured account
    List,
}

#[tokio::main]
async fn main() {
    // Initialize tracing (controlled by RUST_LOG env var).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::from_env()?;
    if let Some(home) = cli.home {
        config.home = home;
    }
    if cli.ask_passphrase {
        let passphrase = rpassword::prompt_password("Enter key passphrase: ")?;
        if passphrase.is_empty() {
            return Err("Passphrase cannot be empty".into());
        }
        config.passphrase = Some(passphrase);
    }

    match cli.command {
        Commands::Init => commands::init::run_init(&config).await,
        Commands::Keygen { bits } => commands::keygen::run_keygen(config, bits).await,
        Commands::Pubkey => commands::pubkey::run_pubkey(config).await,
        Commands::Split { secret, pieces, threshold } => {
            commands::split::run_split(config, &secret, pieces, threshold).await
        }
        Commands::Combine { shares } => commands::combine::run_combine(&shares).await,
        Commands::Protect { secret, recipient, keepers, pieces, threshold } => {
            let options = commands::protect::ProtectOptions {
                recipient,
                keepers,
                pieces,
                threshold,
            };
            commands::protect::run_protect(config, &secret, options).await
        }
        Commands::Reveal { references } => commands::reveal::run_reveal(config, &references).await,
        Commands::Keeper { action: KeeperAction::Create { keeper } } => {
            commands::keeper::run_keeper_create(config, &keeper).await
        }
        Commands::Keeper { action: KeeperAction::List } => commands::keeper::run_keeper_list(config).await,
        Commands::Status => commands::status::run_status(config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_command_parses_to_its_own_arm() {
        let cli = Cli::try_parse_from(["chimalli", "combine", "01aa", "02bb"]).unwrap();
        assert!(matches!(cli.command, Commands::Combine { ref shares } if shares.len() == 2));

        let cli = Cli::try_parse_from(["chimalli", "--home", "/tmp/c", "init"]).unwrap();
        assert!(matches!(cli.command, Commands::Init));
        assert_eq!(cli.home, Some(PathBuf::from("/tmp/c")));

        let cli = Cli::try_parse_from([
            "chimalli", "protect", "aztec gold", "--keeper", "0xa", "--keeper", "0xb", "--threshold", "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Protect { keepers, threshold, pieces, recipient, .. } => {
                assert_eq!(keepers, vec!["0xa", "0xb"]);
                assert_eq!(threshold, Some(2));
                assert!(pieces.is_none());
                assert!(recipient.is_none());
            }
            _ => panic!("expected protect"),
        }

        let cli = Cli::try_parse_from(["chimalli", "keeper", "list"]).unwrap();
        assert!(matches!(cli.command, Commands::Keeper { action: KeeperAction::List }));
    }

    #[test]
    fn test_commands_requiring_arguments_reject_empty_input() {
        assert!(Cli::try_parse_from(["chimalli", "combine"]).is_err());
        assert!(Cli::try_parse_from(["chimalli", "reveal"]).is_err());
        assert!(Cli::try_parse_from(["chimalli"]).is_err());
    }
}
