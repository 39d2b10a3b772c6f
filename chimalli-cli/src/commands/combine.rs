use chimalli_core::sharing::{combine, Share};

use super::display_secret;

/// Recombine hex-encoded shares. Needs no home directory.
pub async fn run_combine(shares: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let shares = shares
        .iter()
        .map(|s| Share::from_hex(s))
        .collect::<Result<Vec<_>, _>>()?;

    let secret = combine(&shares)?;
    println!("{}", display_secret(&secret));
    Ok(())
}
