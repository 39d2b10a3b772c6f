use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{ChimalliError, Result};

/// User-adjustable sharing and key parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharingConfig {
    pub threshold: u8,
    pub total_pieces: u8,
    pub key_bit_strength: u16,
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            total_pieces: DEFAULT_TOTAL_PIECES,
            key_bit_strength: DEFAULT_KEY_BITS,
        }
    }
}

impl SharingConfig {
    pub fn validate(&self) -> Result<()> {
        validate_sharing(self.total_pieces, self.threshold)?;
        validate_key_bits(self.key_bit_strength)
    }
}

/// Check `MIN_SHARES <= total <= MAX_SHARES` and `1 <= threshold <= total`.
pub fn validate_sharing(total: u8, threshold: u8) -> Result<()> {
    if total < MIN_SHARES {
        return Err(ChimalliError::InvalidParameters(format!(
            "total pieces must be at least {MIN_SHARES}, got {total}"
        )));
    }
    // u8 already caps total at MAX_SHARES.
    if threshold == 0 {
        return Err(ChimalliError::InvalidParameters(
            "threshold must be at least 1".to_string(),
        ));
    }
    if threshold > total {
        return Err(ChimalliError::InvalidParameters(format!(
            "threshold {threshold} exceeds total pieces {total}"
        )));
    }
    Ok(())
}

pub fn validate_key_bits(bits: u16) -> Result<()> {
    if SUPPORTED_KEY_BITS.contains(&bits) {
        Ok(())
    } else {
        Err(ChimalliError::InvalidParameters(format!(
            "unsupported key strength {bits} bits (supported: {SUPPORTED_KEY_BITS:?})"
        )))
    }
}
