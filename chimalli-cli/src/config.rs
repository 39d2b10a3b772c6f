use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use chimalli_core::config::SharingConfig;
use chimalli_core::constants::DEFAULT_KEY_BITS;

/// CLI configuration loaded from environment variables.
pub struct Config {
    /// Directory holding the metadata DB and blob store.
    pub home: PathBuf,
    /// Account that owns registry entries created from this device.
    pub account: String,
    /// Unset values fall back to the cached share configuration.
    pub threshold: Option<u8>,
    pub total_pieces: Option<u8>,
    pub key_bits: u16,
    /// Seals the private key at rest when set.
    pub passphrase: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// - `CHIMALLI_HOME` (optional, default `.chimalli`)
    /// - `CHIMALLI_ACCOUNT` (optional, default `local`)
    /// - `CHIMALLI_THRESHOLD` / `CHIMALLI_PIECES` (optional)
    /// - `CHIMALLI_KEY_BITS` (optional, default 256)
    /// - `CHIMALLI_PASSPHRASE` (optional)
    ///
    /// A numeric variable that is set but does not parse is an error.
    pub fn from_env() -> Result<Self, String> {
        let home = env::var("CHIMALLI_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".chimalli"));

        let account = env::var("CHIMALLI_ACCOUNT").unwrap_or_else(|_| "local".to_string());

        let threshold = parse_setting("CHIMALLI_THRESHOLD", env::var("CHIMALLI_THRESHOLD").ok())?;
        let total_pieces = parse_setting("CHIMALLI_PIECES", env::var("CHIMALLI_PIECES").ok())?;
        let key_bits = parse_setting("CHIMALLI_KEY_BITS", env::var("CHIMALLI_KEY_BITS").ok())?
            .unwrap_or(DEFAULT_KEY_BITS);

        let passphrase = env::var("CHIMALLI_PASSPHRASE").ok().filter(|p| !p.is_empty());

        Ok(Self {
            home,
            account,
            threshold,
            total_pieces,
            key_bits,
            passphrase,
        })
    }

    /// Sharing parameters: explicit flags, then environment, then `remembered`.
    pub fn sharing(
        &self,
        pieces: Option<u8>,
        threshold: Option<u8>,
        remembered: SharingConfig,
    ) -> SharingConfig {
        SharingConfig {
            threshold: threshold.or(self.threshold).unwrap_or(remembered.threshold),
            total_pieces: pieces.or(self.total_pieces).unwrap_or(remembered.total_pieces),
            key_bit_strength: self.key_bits,
        }
    }

    pub fn meta_db_path(&self) -> PathBuf {
        self.home.join("meta.db")
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.home.join("blobs")
    }
}

/// Parse an optional numeric setting; blank counts as unset.
fn parse_setting<T: FromStr>(name: &str, raw: Option<String>) -> Result<Option<T>, String> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("{name} must be a number in range, got '{value}'")),
    }
}
