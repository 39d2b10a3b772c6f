//! ECIES envelope over P-256.
//!
//! Layout: `version(1) || ephemeral SEC1 point(65) || nonce(12) || AES-256-GCM ciphertext+tag`.
//! The envelope key is HKDF-SHA256 over the hashed ECDH secret, salted with
//! both public points so a ciphertext is bound to its recipient.

use super::aead::{aes256_gcm_decrypt, aes256_gcm_encrypt};
use super::ecdh::{compute_p256_shared_secret, encode_public_key, generate_p256_keypair, parse_public_key, public_key_for};
use super::kdf::hkdf_sha256;
use super::{CryptoError, Result};
use crate::constants::*;
use crate::traits::random::SecureRandom;

const HEADER_LEN: usize = 1 + P256_PUBLIC_KEY_LEN + AES_GCM_NONCE_LEN;

/// Smallest well-formed envelope: header plus an empty ciphertext's tag.
pub const MIN_ENVELOPE_LEN: usize = HEADER_LEN + AES_GCM_TAG_LEN;

fn envelope_key(
    shared_secret: &[u8],
    ephemeral_public: &[u8],
    recipient_public: &[u8],
) -> Result<zeroize::Zeroizing<[u8; 32]>> {
    let mut salt = Vec::with_capacity(ephemeral_public.len() + recipient_public.len());
    salt.extend_from_slice(ephemeral_public);
    salt.extend_from_slice(recipient_public);
    hkdf_sha256(&salt, shared_secret, LABEL_SHARE_SEAL.as_bytes())
}

/// Seal `plaintext` to `recipient_public_key`, authenticating `aad` alongside it.
pub fn seal(
    recipient_public_key: &[u8],
    plaintext: &[u8],
    aad: &[u8],
    rng: &dyn SecureRandom,
) -> Result<Vec<u8>> {
    // Normalise to the uncompressed encoding so both sides salt identically.
    let recipient = encode_public_key(&parse_public_key(recipient_public_key)?);

    let ephemeral = generate_p256_keypair(rng)?;
    let shared = compute_p256_shared_secret(&ephemeral.private_key, &recipient)?;
    let key = envelope_key(shared.as_slice(), &ephemeral.public_key, &recipient)?;

    let mut nonce = [0u8; AES_GCM_NONCE_LEN];
    rng.fill_bytes(&mut nonce)
        .map_err(|e| CryptoError::AesGcmEncrypt(e.to_string()))?;

    let ciphertext = aes256_gcm_encrypt(&key, &nonce, plaintext, aad)?;

    let mut envelope = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    envelope.push(ENVELOPE_VERSION);
    envelope.extend_from_slice(&ephemeral.public_key);
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

/// Open an envelope produced by [`seal`] with the recipient's private key.
pub fn open(private_key: &[u8], envelope: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if envelope.len() < MIN_ENVELOPE_LEN {
        return Err(CryptoError::MalformedEnvelope(format!(
            "envelope too short: {} bytes",
            envelope.len()
        )));
    }
    if envelope[0] != ENVELOPE_VERSION {
        return Err(CryptoError::MalformedEnvelope(format!(
            "unknown envelope version {:#04x}",
            envelope[0]
        )));
    }

    let ephemeral_public = &envelope[1..1 + P256_PUBLIC_KEY_LEN];
    let nonce: [u8; AES_GCM_NONCE_LEN] = envelope[1 + P256_PUBLIC_KEY_LEN..HEADER_LEN]
        .try_into()
        .map_err(|_| CryptoError::MalformedEnvelope("bad nonce".to_string()))?;
    let ciphertext = &envelope[HEADER_LEN..];

    let recipient = public_key_for(private_key)?;
    let shared = compute_p256_shared_secret(private_key, ephemeral_public)?;
    let key = envelope_key(shared.as_slice(), ephemeral_public, &recipient)?;

    aes256_gcm_decrypt(&key, &nonce, ciphertext, aad)
}
