use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::config::validate_key_bits;
use crate::constants::{P256_PRIVATE_KEY_LEN, P256_PUBLIC_KEY_LEN};
use crate::crypto::{ecdh, ecies};
use crate::error::{ChimalliError, Result};
use crate::traits::random::SecureRandom;

/// SEC1 uncompressed P-256 point, validated on construction.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    /// Accepts compressed or uncompressed SEC1 and stores the uncompressed form.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self> {
        let point = ecdh::parse_public_key(bytes)?;
        Ok(Self(ecdh::encode_public_key(&point)))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| ChimalliError::InvalidParameters(format!("public key is not hex: {e}")))?;
        Self::from_sec1_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// First 8 bytes of SHA-256 over the encoded point, as hex.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.0);
        hex::encode(&digest[..8])
    }
}

impl TryFrom<Vec<u8>> for PublicKey {
    type Error = ChimalliError;

    fn try_from(bytes: Vec<u8>) -> Result<Self> {
        Self::from_sec1_bytes(&bytes)
    }
}

impl From<PublicKey> for Vec<u8> {
    fn from(key: PublicKey) -> Self {
        key.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.fingerprint())
    }
}

/// P-256 scalar. Wiped on drop and never printed.
#[derive(Clone)]
pub struct PrivateKey(Zeroizing<Vec<u8>>);

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != P256_PRIVATE_KEY_LEN {
            return Err(crate::crypto::CryptoError::InvalidKeyLength {
                expected: P256_PRIVATE_KEY_LEN,
                got: bytes.len(),
            }
            .into());
        }
        // Reject scalars outside the group before they reach a cipher.
        ecdh::public_key_for(bytes)?;
        Ok(Self(Zeroizing::new(bytes.to_vec())))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// A complete keypair. There is no half-populated value: absence of a
/// keypair is `Option::<Keypair>::None`.
#[derive(Clone, Debug)]
pub struct Keypair {
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
}

impl Keypair {
    /// Generate a fresh keypair of the requested strength.
    ///
    /// Any failure, including an exhausted entropy source, is reported as
    /// [`ChimalliError::KeyGeneration`].
    pub fn generate(bits: u16, rng: &dyn SecureRandom) -> Result<Self> {
        validate_key_bits(bits)?;

        let raw = ecdh::generate_p256_keypair(rng)
            .map_err(|e| ChimalliError::KeyGeneration(e.to_string()))?;
        debug_assert_eq!(raw.public_key.len(), P256_PUBLIC_KEY_LEN);

        Ok(Self {
            public_key: PublicKey(raw.public_key),
            private_key: PrivateKey(raw.private_key),
        })
    }

    /// Rebuild a keypair from stored halves, checking that they belong together.
    pub fn from_parts(public_key: &[u8], private_key: &[u8]) -> Result<Self> {
        let private_key = PrivateKey::from_bytes(private_key)?;
        let public_key = PublicKey::from_sec1_bytes(public_key)?;

        let derived = ecdh::public_key_for(private_key.as_bytes())?;
        if derived != public_key.as_bytes() {
            return Err(ChimalliError::InvalidParameters(
                "public key does not match private key".to_string(),
            ));
        }
        Ok(Self { public_key, private_key })
    }
}

/// Encrypt `plaintext` so only the holder of `recipient`'s private key can read it.
pub fn encrypt(plaintext: &[u8], recipient: &PublicKey, rng: &dyn SecureRandom) -> Result<Vec<u8>> {
    encrypt_with_context(plaintext, recipient, &[], rng)
}

/// Decrypt a payload produced by [`encrypt`].
///
/// Every failure (foreign key, truncation, tampering) is [`ChimalliError::Decryption`].
pub fn decrypt(ciphertext: &[u8], private_key: &PrivateKey) -> Result<Vec<u8>> {
    decrypt_with_context(ciphertext, private_key, &[])
}

pub(crate) fn encrypt_with_context(
    plaintext: &[u8],
    recipient: &PublicKey,
    context: &[u8],
    rng: &dyn SecureRandom,
) -> Result<Vec<u8>> {
    Ok(ecies::seal(recipient.as_bytes(), plaintext, context, rng)?)
}

pub(crate) fn decrypt_with_context(
    ciphertext: &[u8],
    private_key: &PrivateKey,
    context: &[u8],
) -> Result<Vec<u8>> {
    ecies::open(private_key.as_bytes(), ciphertext, context)
        .map_err(|e| ChimalliError::Decryption(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingRandom, TestRandom};

    #[test]
    fn test_generate_keypair() {
        let kp = Keypair::generate(256, &TestRandom).unwrap();
        assert_eq!(kp.public_key.as_bytes().len(), P256_PUBLIC_KEY_LEN);
        assert_eq!(kp.private_key.as_bytes().len(), P256_PRIVATE_KEY_LEN);
        assert_eq!(kp.public_key.fingerprint().len(), 16);
    }

    #[test]
    fn test_generate_rejects_unsupported_strength() {
        let result = Keypair::generate(4096, &TestRandom);
        assert!(matches!(result, Err(ChimalliError::InvalidParameters(_))));
    }

    #[test]
    fn test_generate_reports_entropy_failure() {
        let result = Keypair::generate(256, &FailingRandom);
        assert!(matches!(result, Err(ChimalliError::KeyGeneration(_))));
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let kp = Keypair::generate(256, &TestRandom).unwrap();
        let payloads: [&[u8]; 4] = [b"", b"x", b"I know where the aztec gold is.", &[0xAB; 4096]];
        for payload in payloads {
            let ciphertext = encrypt(payload, &kp.public_key, &TestRandom).unwrap();
            assert_eq!(decrypt(&ciphertext, &kp.private_key).unwrap(), payload);
        }
    }

    #[test]
    fn test_decrypt_with_foreign_key_is_decryption_error() {
        let alice = Keypair::generate(256, &TestRandom).unwrap();
        let mallory = Keypair::generate(256, &TestRandom).unwrap();

        let ciphertext = encrypt(b"for alice", &alice.public_key, &TestRandom).unwrap();
        assert!(matches!(
            decrypt(&ciphertext, &mallory.private_key),
            Err(ChimalliError::Decryption(_))
        ));
        assert!(matches!(
            decrypt(&ciphertext[..10], &alice.private_key),
            Err(ChimalliError::Decryption(_))
        ));
    }

    #[test]
    fn test_public_key_hex_and_serde() {
        let kp = Keypair::generate(256, &TestRandom).unwrap();
        let parsed = PublicKey::from_hex(&kp.public_key.to_hex()).unwrap();
        assert_eq!(parsed, kp.public_key);

        let bytes = bincode::serialize(&kp.public_key).unwrap();
        let decoded: PublicKey = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, kp.public_key);

        let garbage = bincode::serialize(&vec![0x04u8; 65]).unwrap();
        assert!(bincode::deserialize::<PublicKey>(&garbage).is_err());
    }

    #[test]
    fn test_from_parts_detects_mismatch() {
        let a = Keypair::generate(256, &TestRandom).unwrap();
        let b = Keypair::generate(256, &TestRandom).unwrap();

        let rebuilt = Keypair::from_parts(a.public_key.as_bytes(), a.private_key.as_bytes()).unwrap();
        assert_eq!(rebuilt.public_key, a.public_key);

        let mixed = Keypair::from_parts(a.public_key.as_bytes(), b.private_key.as_bytes());
        assert!(matches!(mixed, Err(ChimalliError::InvalidParameters(_))));
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let kp = Keypair::generate(256, &TestRandom).unwrap();
        let shown = format!("{kp:?}");
        assert!(shown.contains("<redacted>"));
        assert!(!shown.contains(&hex::encode(kp.private_key.as_bytes())));
    }
}
