//! Keypair lifecycle: generation, durable storage, and the encrypt/decrypt contract.

pub mod keypair;
pub mod record;
pub mod manager;

pub use keypair::{decrypt, encrypt, Keypair, PrivateKey, PublicKey};
pub use manager::{KeyGeneration, KeyManager, KeyStatus};
