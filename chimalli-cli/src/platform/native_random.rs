use chimalli_core::error::ChimalliError;
use chimalli_core::traits::random::SecureRandom;

/// OS CSPRNG via getrandom.
#[derive(Default)]
pub struct NativeRandom;

impl NativeRandom {
    pub fn new() -> Self {
        Self
    }
}

impl SecureRandom for NativeRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), ChimalliError> {
        getrandom::getrandom(dest)
            .map_err(|e| ChimalliError::Platform(format!("getrandom failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_requested_length() {
        let rng = NativeRandom::new();
        let a = rng.random_bytes(32).unwrap();
        let b = rng.random_bytes(32).unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
