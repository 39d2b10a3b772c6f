use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChimalliError {
    #[error("Crypto error: {0}")]
    Crypto(#[from] crate::crypto::CryptoError),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Malformed share set: {0}")]
    MalformedShareSet(String),

    #[error("Inconsistent shares: {0}")]
    InconsistentShares(String),

    #[error("Insufficient shares: need {required}, got {supplied}")]
    InsufficientShares { required: usize, supplied: usize },

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Platform error: {0}")]
    Platform(String),
}

impl ChimalliError {
    /// Collaborator failures the caller may retry. The core never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChimalliError::Storage(_) | ChimalliError::Registry(_))
    }
}

pub type Result<T> = std::result::Result<T, ChimalliError>;
