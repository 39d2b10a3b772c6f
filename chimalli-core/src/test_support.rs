//! Randomness sources shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::ChimalliError;
use crate::traits::random::SecureRandom;

pub struct TestRandom;

impl SecureRandom for TestRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), ChimalliError> {
        getrandom::getrandom(dest).map_err(|e| ChimalliError::Platform(e.to_string()))
    }
}

/// Always fails, simulating an entropy source that is unavailable.
pub struct FailingRandom;

impl SecureRandom for FailingRandom {
    fn fill_bytes(&self, _dest: &mut [u8]) -> Result<(), ChimalliError> {
        Err(ChimalliError::Platform("entropy source unavailable".to_string()))
    }
}

/// Serves `budget` successful fills, then fails every call after that.
pub struct FlakyRandom {
    remaining: AtomicUsize,
}

impl FlakyRandom {
    pub fn new(budget: usize) -> Self {
        Self { remaining: AtomicUsize::new(budget) }
    }
}

impl SecureRandom for FlakyRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), ChimalliError> {
        let left = self.remaining.load(Ordering::SeqCst);
        if left == 0 {
            return Err(ChimalliError::Platform("entropy source exhausted".to_string()));
        }
        self.remaining.store(left - 1, Ordering::SeqCst);
        TestRandom.fill_bytes(dest)
    }
}

/// Sleeps before every fill, keeping CPU-bound work in flight for a while.
pub struct SlowRandom {
    delay: Duration,
}

impl SlowRandom {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl SecureRandom for SlowRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), ChimalliError> {
        std::thread::sleep(self.delay);
        TestRandom.fill_bytes(dest)
    }
}
