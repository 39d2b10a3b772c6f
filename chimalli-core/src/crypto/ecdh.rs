use elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey as P256PublicKey, SecretKey as P256SecretKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::{CryptoError, Result};
use crate::constants::{P256_PRIVATE_KEY_LEN, P256_PUBLIC_KEY_LEN};
use crate::traits::random::SecureRandom;

/// Attempts before giving up on drawing a valid scalar.
const KEYGEN_ATTEMPTS: usize = 8;

/// Raw ECDH P-256 key pair bytes.
pub struct P256KeyPair {
    pub private_key: Zeroizing<Vec<u8>>,
    pub public_key: Vec<u8>,
}

/// Generate a new ECDH P-256 key pair using the provided SecureRandom source.
///
/// The public key is the 65-byte SEC1 uncompressed point.
pub fn generate_p256_keypair(rng: &dyn SecureRandom) -> Result<P256KeyPair> {
    let mut key_bytes = Zeroizing::new([0u8; P256_PRIVATE_KEY_LEN]);

    for _ in 0..KEYGEN_ATTEMPTS {
        rng.fill_bytes(&mut key_bytes[..])
            .map_err(|e| CryptoError::EcdhKeyGen(e.to_string()))?;

        // Zero or >= group order: draw again.
        let Ok(secret) = P256SecretKey::from_slice(&key_bytes[..]) else {
            continue;
        };

        let encoded = secret.public_key().to_encoded_point(false);
        return Ok(P256KeyPair {
            private_key: Zeroizing::new(secret.to_bytes().to_vec()),
            public_key: encoded.as_bytes().to_vec(),
        });
    }

    Err(CryptoError::EcdhKeyGen(format!(
        "no valid scalar after {KEYGEN_ATTEMPTS} attempts"
    )))
}

/// Parse and validate a SEC1-encoded P-256 public key.
pub fn parse_public_key(bytes: &[u8]) -> Result<P256PublicKey> {
    P256PublicKey::from_sec1_bytes(bytes).map_err(|_| CryptoError::InvalidPublicKey)
}

/// Re-encode a public key as a SEC1 uncompressed point.
pub fn encode_public_key(key: &P256PublicKey) -> Vec<u8> {
    let encoded = key.to_encoded_point(false);
    debug_assert_eq!(encoded.len(), P256_PUBLIC_KEY_LEN);
    encoded.as_bytes().to_vec()
}

/// Derive the public key that belongs to a private scalar.
pub fn public_key_for(private_key: &[u8]) -> Result<Vec<u8>> {
    let secret = P256SecretKey::from_slice(private_key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: P256_PRIVATE_KEY_LEN,
        got: private_key.len(),
    })?;
    Ok(encode_public_key(&secret.public_key()))
}

/// Compute ECDH P-256 shared secret, then SHA-256 hash it.
/// Returns SHA256(shared_secret), which is 32 bytes.
pub fn compute_p256_shared_secret(
    private_key: &[u8],
    peer_public_key: &[u8],
) -> Result<Zeroizing<[u8; 32]>> {
    let secret_key = P256SecretKey::from_slice(private_key)
        .map_err(|e| CryptoError::EcdhSharedSecret(format!("invalid private key: {e}")))?;

    let peer_pub = parse_public_key(peer_public_key)?;

    let shared_secret = p256::ecdh::diffie_hellman(
        secret_key.to_nonzero_scalar(),
        peer_pub.as_affine(),
    );

    let hash: [u8; 32] = Sha256::digest(shared_secret.raw_secret_bytes()).into();
    Ok(Zeroizing::new(hash))
}
