use std::collections::HashSet;

use tracing::debug;

use super::share::Share;
use crate::crypto::gf256::{add, lagrange_weights_at_zero, mul};
use crate::error::{ChimalliError, Result};

/// Recover the secret by Lagrange interpolation at x = 0.
///
/// The codec does not know the threshold: fewer shares than were required at
/// split time interpolate a different polynomial and return wrong bytes
/// without an error. Use [`crate::pipeline::reveal`] when the threshold is
/// known and a short share set must be reported.
pub fn combine(shares: &[Share]) -> Result<Vec<u8>> {
    let first = shares
        .first()
        .ok_or_else(|| ChimalliError::MalformedShareSet("no shares supplied".to_string()))?;

    let mut seen = HashSet::with_capacity(shares.len());
    for share in shares {
        if share.index == 0 {
            return Err(ChimalliError::MalformedShareSet(
                "share index 0 is reserved for the secret".to_string(),
            ));
        }
        if !seen.insert(share.index) {
            return Err(ChimalliError::MalformedShareSet(format!(
                "duplicate share index {}",
                share.index
            )));
        }
    }

    let len = first.value.len();
    if len == 0 {
        return Err(ChimalliError::MalformedShareSet("shares carry no value".to_string()));
    }
    if let Some(odd) = shares.iter().find(|s| s.value.len() != len) {
        return Err(ChimalliError::InconsistentShares(format!(
            "share {} has {} bytes, share {} has {}",
            first.index,
            len,
            odd.index,
            odd.value.len()
        )));
    }

    let xs: Vec<u8> = shares.iter().map(|s| s.index).collect();
    let weights = lagrange_weights_at_zero(&xs).ok_or_else(|| {
        ChimalliError::MalformedShareSet("evaluation points are not distinct".to_string())
    })?;

    let secret = (0..len)
        .map(|position| {
            shares
                .iter()
                .zip(&weights)
                .fold(0u8, |acc, (share, &w)| add(acc, mul(w, share.value[position])))
        })
        .collect();

    debug!("Combined {} shares into {}-byte secret", shares.len(), len);
    Ok(secret)
}
