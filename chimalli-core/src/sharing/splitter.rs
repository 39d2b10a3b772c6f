use tracing::debug;
use zeroize::Zeroizing;

use super::share::{Share, ShareSet};
use crate::config::validate_sharing;
use crate::crypto::gf256::poly_eval;
use crate::error::{ChimalliError, Result};
use crate::traits::random::SecureRandom;

/// Split `secret` into `total` shares, any `threshold` of which recover it.
///
/// Every secret byte is the constant term of its own polynomial of degree
/// `threshold - 1`; the other coefficients are drawn fresh from `rng` on each
/// call. Share `i` is the evaluation of all polynomials at `x = i`.
pub fn split(
    secret: &[u8],
    total: u8,
    threshold: u8,
    rng: &dyn SecureRandom,
) -> Result<ShareSet> {
    validate_sharing(total, threshold)?;
    if secret.is_empty() {
        return Err(ChimalliError::InvalidParameters("secret must not be empty".to_string()));
    }

    let degree = usize::from(threshold) - 1;

    // One random row of `degree` coefficients per secret byte.
    let mut random = Zeroizing::new(vec![0u8; secret.len() * degree]);
    rng.fill_bytes(&mut random)?;

    let mut shares: Vec<Share> = (1..=total)
        .map(|index| Share { index, value: Vec::with_capacity(secret.len()) })
        .collect();

    let mut coefficients = Zeroizing::new(vec![0u8; usize::from(threshold)]);
    for (position, &byte) in secret.iter().enumerate() {
        coefficients[0] = byte;
        coefficients[1..].copy_from_slice(&random[position * degree..(position + 1) * degree]);

        for share in &mut shares {
            share.value.push(poly_eval(&coefficients, share.index));
        }
    }

    debug!(
        "Split {}-byte secret into {} shares (threshold {})",
        secret.len(),
        total,
        threshold
    );

    Ok(ShareSet { threshold, shares })
}
