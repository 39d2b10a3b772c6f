use serde::{Deserialize, Serialize};

use crate::error::{ChimalliError, Result};

/// One evaluation of the per-byte sharing polynomials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    /// Evaluation point (1-255, never 0).
    pub index: u8,
    /// One field element per secret byte.
    pub value: Vec<u8>,
}

impl Share {
    /// Encode as two hex digits of index followed by the hex value.
    pub fn to_hex(&self) -> String {
        format!("{:02x}{}", self.index, hex::encode(&self.value))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| ChimalliError::MalformedShareSet(format!("share is not hex: {e}")))?;
        let (&index, value) = bytes
            .split_first()
            .ok_or_else(|| ChimalliError::MalformedShareSet("empty share".to_string()))?;
        if index == 0 {
            return Err(ChimalliError::MalformedShareSet(
                "share index 0 is reserved for the secret".to_string(),
            ));
        }
        if value.is_empty() {
            return Err(ChimalliError::MalformedShareSet(format!(
                "share {index} carries no value"
            )));
        }
        Ok(Self { index, value: value.to_vec() })
    }
}

/// The full output of one `split` call, tagged with its threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareSet {
    pub threshold: u8,
    pub shares: Vec<Share>,
}

impl ShareSet {
    pub fn total(&self) -> usize {
        self.shares.len()
    }

    pub fn get(&self, index: u8) -> Option<&Share> {
        self.shares.iter().find(|s| s.index == index)
    }
}
