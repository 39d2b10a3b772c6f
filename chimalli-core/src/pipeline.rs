//! Share encryption pipeline: split then seal (`protect`), open then combine (`reveal`).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::Zeroize;

use crate::config::SharingConfig;
use crate::error::{ChimalliError, Result};
use crate::keys::keypair::{decrypt_with_context, encrypt_with_context};
use crate::keys::{PrivateKey, PublicKey};
use crate::sharing::{combine, split, Share};
use crate::traits::random::SecureRandom;

/// A share whose value is sealed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedShare {
    pub index: u8,
    pub threshold: u8,
    /// Fingerprint of the recipient's public key.
    pub recipient: String,
    pub ciphertext: Vec<u8>,
}

impl EncryptedShare {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| ChimalliError::Serialization(e.to_string()))
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| ChimalliError::Serialization(e.to_string()))
    }
}

/// Associated data binding a sealed value to its share metadata.
fn share_context(index: u8, threshold: u8) -> [u8; 2] {
    [index, threshold]
}

/// Split `secret` and seal every share value to `recipient`.
///
/// All-or-nothing: if any share fails to seal, nothing is returned.
pub fn protect(
    secret: &[u8],
    total: u8,
    threshold: u8,
    recipient: &PublicKey,
    rng: &dyn SecureRandom,
) -> Result<Vec<EncryptedShare>> {
    let mut set = split(secret, total, threshold, rng)?;
    let fingerprint = recipient.fingerprint();

    let sealed = set
        .shares
        .iter()
        .map(|share| {
            let context = share_context(share.index, threshold);
            Ok(EncryptedShare {
                index: share.index,
                threshold,
                recipient: fingerprint.clone(),
                ciphertext: encrypt_with_context(&share.value, recipient, &context, rng)?,
            })
        })
        .collect::<Result<Vec<_>>>();

    for share in &mut set.shares {
        share.value.zeroize();
    }

    let sealed = sealed?;
    info!(
        "Protected secret as {} shares (threshold {}) for {}",
        sealed.len(),
        threshold,
        fingerprint
    );
    Ok(sealed)
}

/// [`protect`] with the pieces and threshold taken from `config`.
pub fn protect_with_config(
    secret: &[u8],
    config: &SharingConfig,
    recipient: &PublicKey,
    rng: &dyn SecureRandom,
) -> Result<Vec<EncryptedShare>> {
    config.validate()?;
    protect(secret, config.total_pieces, config.threshold, recipient, rng)
}

/// Open each share with `private_key` and recombine the secret.
///
/// Unlike the bare codec, a set smaller than the recorded threshold is
/// reported as [`ChimalliError::InsufficientShares`] instead of yielding
/// wrong bytes.
pub fn reveal(encrypted_shares: &[EncryptedShare], private_key: &PrivateKey) -> Result<Vec<u8>> {
    let first = encrypted_shares
        .first()
        .ok_or_else(|| ChimalliError::MalformedShareSet("no shares supplied".to_string()))?;
    let threshold = first.threshold;

    if let Some(odd) = encrypted_shares.iter().find(|s| s.threshold != threshold) {
        return Err(ChimalliError::InconsistentShares(format!(
            "share {} was split with threshold {}, share {} with {}",
            first.index, threshold, odd.index, odd.threshold
        )));
    }

    let mut seen = HashSet::with_capacity(encrypted_shares.len());
    for share in encrypted_shares {
        if !seen.insert(share.index) {
            return Err(ChimalliError::MalformedShareSet(format!(
                "duplicate share index {}",
                share.index
            )));
        }
    }

    if encrypted_shares.len() < usize::from(threshold) {
        return Err(ChimalliError::InsufficientShares {
            required: usize::from(threshold),
            supplied: encrypted_shares.len(),
        });
    }

    let mut shares = encrypted_shares
        .iter()
        .map(|s| {
            let value = decrypt_with_context(&s.ciphertext, private_key, &share_context(s.index, s.threshold))?;
            Ok(Share { index: s.index, value })
        })
        .collect::<Result<Vec<_>>>()?;

    let secret = combine(&shares);
    for share in &mut shares {
        share.value.zeroize();
    }

    debug!("Revealed secret from {} of {} required shares", encrypted_shares.len(), threshold);
    secret
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Keypair;
    use crate::test_support::{FlakyRandom, TestRandom};

    const AZTEC: &[u8] = b"I know where the aztec gold is.";

    fn keypair() -> Keypair {
        Keypair::generate(256, &TestRandom).unwrap()
    }

    #[test]
    fn test_protect_reveal_roundtrip() {
        let kp = keypair();
        let sealed = protect(AZTEC, 3, 2, &kp.public_key, &TestRandom).unwrap();

        assert_eq!(sealed.len(), 3);
        for (i, share) in sealed.iter().enumerate() {
            assert_eq!(share.index as usize, i + 1);
            assert_eq!(share.threshold, 2);
            assert_eq!(share.recipient, kp.public_key.fingerprint());
        }

        assert_eq!(reveal(&sealed[1..], &kp.private_key).unwrap(), AZTEC);
        assert_eq!(reveal(&[sealed[2].clone(), sealed[0].clone()], &kp.private_key).unwrap(), AZTEC);
        assert_eq!(reveal(&sealed, &kp.private_key).unwrap(), AZTEC);
    }

    #[test]
    fn test_reveal_reports_insufficient_shares() {
        let kp = keypair();
        let sealed = protect(AZTEC, 5, 3, &kp.public_key, &TestRandom).unwrap();

        let result = reveal(&sealed[..2], &kp.private_key);
        assert!(matches!(
            result,
            Err(ChimalliError::InsufficientShares { required: 3, supplied: 2 })
        ));
    }

    #[test]
    fn test_reveal_with_wrong_key_is_decryption_error() {
        let owner = keypair();
        let stranger = keypair();
        let sealed = protect(AZTEC, 3, 2, &owner.public_key, &TestRandom).unwrap();

        assert!(matches!(
            reveal(&sealed, &stranger.private_key),
            Err(ChimalliError::Decryption(_))
        ));
    }

    #[test]
    fn test_reveal_detects_tampered_metadata() {
        let kp = keypair();
        let mut sealed = protect(AZTEC, 3, 2, &kp.public_key, &TestRandom).unwrap();

        // Swapping an index is caught by the associated data, not by interpolation.
        sealed[0].index = 3;
        sealed[2].index = 1;
        assert!(matches!(
            reveal(&sealed[..2], &kp.private_key),
            Err(ChimalliError::Decryption(_))
        ));
    }

    #[test]
    fn test_reveal_rejects_malformed_sets() {
        let kp = keypair();
        let a = protect(AZTEC, 3, 2, &kp.public_key, &TestRandom).unwrap();
        let b = protect(AZTEC, 4, 3, &kp.public_key, &TestRandom).unwrap();

        assert!(matches!(reveal(&[], &kp.private_key), Err(ChimalliError::MalformedShareSet(_))));
        assert!(matches!(
            reveal(&[a[0].clone(), a[0].clone()], &kp.private_key),
            Err(ChimalliError::MalformedShareSet(_))
        ));
        assert!(matches!(
            reveal(&[a[0].clone(), b[1].clone(), b[2].clone()], &kp.private_key),
            Err(ChimalliError::InconsistentShares(_))
        ));
    }

    #[test]
    fn test_protect_is_all_or_nothing() {
        let kp = keypair();
        // One fill for the split, two per sealed share: the second share fails.
        let rng = FlakyRandom::new(4);
        let result = protect(AZTEC, 3, 2, &kp.public_key, &rng);
        assert!(result.is_err());
    }

    #[test]
    fn test_protect_rejects_invalid_parameters() {
        let kp = keypair();
        assert!(matches!(
            protect(b"", 3, 2, &kp.public_key, &TestRandom),
            Err(ChimalliError::InvalidParameters(_))
        ));
        assert!(matches!(
            protect(AZTEC, 2, 3, &kp.public_key, &TestRandom),
            Err(ChimalliError::InvalidParameters(_))
        ));
        let bad = SharingConfig { key_bit_strength: 100, ..SharingConfig::default() };
        assert!(protect_with_config(AZTEC, &bad, &kp.public_key, &TestRandom).is_err());
    }

    #[test]
    fn test_encrypted_share_bytes_roundtrip() {
        let kp = keypair();
        let sealed = protect(AZTEC, 2, 2, &kp.public_key, &TestRandom).unwrap();
        let bytes = sealed[0].to_bytes().unwrap();
        assert_eq!(EncryptedShare::from_bytes(&bytes).unwrap(), sealed[0]);
        assert!(EncryptedShare::from_bytes(&bytes[..3]).is_err());
    }
}
