use hkdf::Hkdf;
use hmac::Hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::{CryptoError, Result};
use crate::constants::PBKDF2_SALT_LEN;

/// HKDF-SHA256 extract-then-expand into a 32-byte key.
pub fn hkdf_sha256(salt: &[u8], ikm: &[u8], info: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);

    let mut okm = Zeroizing::new([0u8; 32]);
    hkdf.expand(info, &mut okm[..])
        .map_err(|e| CryptoError::HkdfDerive(format!("expand failed: {e}")))?;

    Ok(okm)
}

/// Derive a 32-byte key from a passphrase and salt using PBKDF2-HMAC-SHA256.
pub fn derive_passphrase_key(
    passphrase: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<Zeroizing<[u8; 32]>> {
    if salt.len() < PBKDF2_SALT_LEN {
        return Err(CryptoError::Pbkdf2Derive(format!(
            "salt too short: expected at least {PBKDF2_SALT_LEN}, got {}",
            salt.len()
        )));
    }

    let mut output = Zeroizing::new([0u8; 32]);
    pbkdf2::pbkdf2::<Hmac<Sha256>>(passphrase, salt, iterations, &mut output[..])
        .map_err(|e| CryptoError::Pbkdf2Derive(e.to_string()))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hkdf_deterministic_and_context_bound() {
        let a = hkdf_sha256(b"salt", &[0x42; 32], b"ctx-a").unwrap();
        let b = hkdf_sha256(b"salt", &[0x42; 32], b"ctx-a").unwrap();
        let c = hkdf_sha256(b"salt", &[0x42; 32], b"ctx-b").unwrap();
        assert_eq!(*a, *b);
        assert_ne!(*a, *c);
    }

    #[test]
    fn test_passphrase_key_deterministic() {
        let salt = [0x42u8; 32];
        let key1 = derive_passphrase_key(b"correct horse", &salt, 1000).unwrap();
        let key2 = derive_passphrase_key(b"correct horse", &salt, 1000).unwrap();
        let key3 = derive_passphrase_key(b"battery staple", &salt, 1000).unwrap();
        assert_eq!(*key1, *key2);
        assert_ne!(*key1, *key3);
    }

    #[test]
    fn test_passphrase_salt_too_short() {
        let result = derive_passphrase_key(b"password", &[0x01; 16], 1000);
        assert!(matches!(result, Err(CryptoError::Pbkdf2Derive(_))));
    }
}
