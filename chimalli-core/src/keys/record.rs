use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::keypair::Keypair;
use crate::constants::{PBKDF2_SALT_LEN, XCHACHA20_NONCE_LEN};
use crate::crypto::aead::{xchacha20_decrypt, xchacha20_encrypt};
use crate::crypto::kdf::derive_passphrase_key;
use crate::error::{ChimalliError, Result};
use crate::traits::random::SecureRandom;

const RECORD_VERSION: u8 = 1;

/// How the private half sits at rest.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub enum PrivateKeyRecord {
    Plain(Vec<u8>),
    /// XChaCha20-Poly1305 under a PBKDF2-derived key; the public key is the AAD.
    Sealed {
        salt: Vec<u8>,
        iterations: u32,
        nonce: [u8; XCHACHA20_NONCE_LEN],
        ciphertext: Vec<u8>,
    },
}

/// The single durable value that holds both halves of a keypair.
///
/// Writing it is one store operation, so readers see either the previous
/// record or the new one.
#[derive(Serialize, Deserialize)]
pub struct KeypairRecord {
    pub version: u8,
    pub public_key: Vec<u8>,
    pub private_key: PrivateKeyRecord,
}

impl KeypairRecord {
    /// Build a record, sealing the private key when a passphrase is given.
    pub fn new(
        keypair: &Keypair,
        passphrase: Option<&str>,
        iterations: u32,
        rng: &dyn SecureRandom,
    ) -> Result<Self> {
        let public_key = keypair.public_key.as_bytes().to_vec();

        let private_key = match passphrase {
            None => PrivateKeyRecord::Plain(keypair.private_key.as_bytes().to_vec()),
            Some(passphrase) => {
                let salt = rng.random_bytes(PBKDF2_SALT_LEN)?;
                let mut nonce = [0u8; XCHACHA20_NONCE_LEN];
                rng.fill_bytes(&mut nonce)?;

                let key = derive_passphrase_key(passphrase.as_bytes(), &salt, iterations)?;
                let ciphertext =
                    xchacha20_encrypt(&key, &nonce, keypair.private_key.as_bytes(), &public_key)?;

                PrivateKeyRecord::Sealed { salt, iterations, nonce, ciphertext }
            }
        };

        Ok(Self { version: RECORD_VERSION, public_key, private_key })
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self.private_key, PrivateKeyRecord::Sealed { .. })
    }

    /// Recover the keypair. A sealed record needs the passphrase it was sealed with.
    pub fn open(&self, passphrase: Option<&str>) -> Result<Keypair> {
        if self.version != RECORD_VERSION {
            return Err(ChimalliError::Serialization(format!(
                "unsupported keypair record version {}",
                self.version
            )));
        }

        match &self.private_key {
            PrivateKeyRecord::Plain(private_key) => Keypair::from_parts(&self.public_key, private_key),
            PrivateKeyRecord::Sealed { salt, iterations, nonce, ciphertext } => {
                let passphrase = passphrase.ok_or_else(|| {
                    ChimalliError::Decryption("keypair is sealed; a passphrase is required".to_string())
                })?;
                let key = derive_passphrase_key(passphrase.as_bytes(), salt, *iterations)?;
                let private_key = Zeroizing::new(
                    xchacha20_decrypt(&key, nonce, ciphertext, &self.public_key).map_err(|_| {
                        ChimalliError::Decryption("wrong passphrase or corrupted keypair record".to_string())
                    })?,
                );
                Keypair::from_parts(&self.public_key, &private_key)
            }
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| ChimalliError::Serialization(e.to_string()))
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| ChimalliError::Serialization(e.to_string()))
    }
}
