use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};

use super::{CryptoError, Result};
use crate::constants::{AES_GCM_NONCE_LEN, XCHACHA20_NONCE_LEN};

/// Encrypt with AES-256-GCM, returning ciphertext with appended 16-byte auth tag.
pub fn aes256_gcm_encrypt(
    key: &[u8; 32],
    nonce: &[u8; AES_GCM_NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.into());
    let payload = Payload { msg: plaintext, aad };

    cipher
        .encrypt(Nonce::from_slice(nonce), payload)
        .map_err(|e| CryptoError::AesGcmEncrypt(e.to_string()))
}

/// Decrypt AES-256-GCM ciphertext, verifying the auth tag and AAD.
pub fn aes256_gcm_decrypt(
    key: &[u8; 32],
    nonce: &[u8; AES_GCM_NONCE_LEN],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.into());
    let payload = Payload { msg: ciphertext, aad };

    cipher
        .decrypt(Nonce::from_slice(nonce), payload)
        .map_err(|e| CryptoError::AesGcmDecrypt(e.to_string()))
}

/// Encrypt plaintext with XChaCha20-Poly1305 (keystore sealing).
pub fn xchacha20_encrypt(
    key: &[u8; 32],
    nonce: &[u8; XCHACHA20_NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let payload = Payload { msg: plaintext, aad };

    cipher
        .encrypt(XNonce::from_slice(nonce), payload)
        .map_err(|e| CryptoError::ChaCha20Encrypt(e.to_string()))
}

/// Decrypt ciphertext with XChaCha20-Poly1305 and verify authentication tag.
pub fn xchacha20_decrypt(
    key: &[u8; 32],
    nonce: &[u8; XCHACHA20_NONCE_LEN],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let payload = Payload { msg: ciphertext, aad };

    cipher
        .decrypt(XNonce::from_slice(nonce), payload)
        .map_err(|e| CryptoError::ChaCha20Decrypt(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aes256_gcm_roundtrip() {
        let key = [0x42u8; 32];
        let nonce = [0x01u8; AES_GCM_NONCE_LEN];
        let plaintext = b"share value bytes";

        let ciphertext = aes256_gcm_encrypt(&key, &nonce, plaintext, b"index:1").unwrap();
        assert_eq!(ciphertext.len(), plaintext.len() + 16);

        let decrypted = aes256_gcm_decrypt(&key, &nonce, &ciphertext, b"index:1").unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_aes256_gcm_wrong_aad() {
        let key = [0x42u8; 32];
        let nonce = [0x01u8; AES_GCM_NONCE_LEN];

        let ciphertext = aes256_gcm_encrypt(&key, &nonce, b"secret", b"index:1").unwrap();
        let result = aes256_gcm_decrypt(&key, &nonce, &ciphertext, b"index:2");
        assert!(matches!(result, Err(CryptoError::AesGcmDecrypt(_))));
    }

    #[test]
    fn test_xchacha20_wrong_key() {
        let nonce = [0x01u8; XCHACHA20_NONCE_LEN];

        let ciphertext = xchacha20_encrypt(&[0x42; 32], &nonce, b"private scalar", &[]).unwrap();
        assert_eq!(
            xchacha20_decrypt(&[0x42; 32], &nonce, &ciphertext, &[]).unwrap(),
            b"private scalar"
        );
        let result = xchacha20_decrypt(&[0x43; 32], &nonce, &ciphertext, &[]);
        assert!(matches!(result, Err(CryptoError::ChaCha20Decrypt(_))));
    }
}
