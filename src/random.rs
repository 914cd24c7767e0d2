//! Secure random byte sources
//!
//! All salts, nonces and generated passwords are drawn through the
//! [`SecureRandom`] trait so callers can substitute a fixed source in tests.
//! There is no fallback: if the source fails, the operation fails.

use crate::error::{ErrorCategory, ErrorKind, LockerError, Result};
use rand::RngCore;
use rand::rngs::OsRng;
use std::sync::Mutex;

/// A cryptographically secure source of random bytes.
pub trait SecureRandom {
    /// Fill `dest` entirely with random bytes.
    fn fill(&self, dest: &mut [u8]) -> Result<()>;

    /// Return a buffer of `len` random bytes.
    fn random_bytes(&self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    /// Return a fixed-size array of random bytes.
    fn random_array<const N: usize>(&self) -> Result<[u8; N]>
    where
        Self: Sized,
    {
        let mut buf = [0u8; N];
        self.fill(&mut buf)?;
        Ok(buf)
    }
}

/// The operating system's secure generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl SecureRandom for OsRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        OsRng.try_fill_bytes(dest).map_err(|e| {
            LockerError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::RandomnessUnavailable,
                "secure random generator unavailable",
                e,
            )
        })
    }
}

/// Replays a fixed byte pattern, cycling when it runs out (for testing).
///
/// NEVER use this outside of tests: every encryption would reuse the same
/// salt and nonce.
#[derive(Debug)]
pub struct FixedRandom {
    pattern: Vec<u8>,
    pos: Mutex<usize>,
}

impl FixedRandom {
    pub fn new(pattern: Vec<u8>) -> Self {
        Self {
            pattern,
            pos: Mutex::new(0),
        }
    }
}

impl SecureRandom for FixedRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        if self.pattern.is_empty() {
            return Err(LockerError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::RandomnessUnavailable,
                "fixed random source has an empty pattern",
            ));
        }
        let mut pos = self.pos.lock().map_err(|_| {
            LockerError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::InternalInvariant,
                "fixed random source lock poisoned",
            )
        })?;
        for byte in dest.iter_mut() {
            *byte = self.pattern[*pos];
            *pos = (*pos + 1) % self.pattern.len();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_random_lengths() {
        assert_eq!(OsRandom.random_bytes(0).unwrap().len(), 0);
        assert_eq!(OsRandom.random_bytes(16).unwrap().len(), 16);
        let arr: [u8; 12] = OsRandom.random_array().unwrap();
        assert_eq!(arr.len(), 12);
    }

    #[test]
    fn test_os_random_differs() {
        // 2^-256 chance of a false failure.
        let a: [u8; 32] = OsRandom.random_array().unwrap();
        let b: [u8; 32] = OsRandom.random_array().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fixed_random_cycles() {
        let rng = FixedRandom::new(vec![1, 2, 3]);
        assert_eq!(rng.random_bytes(4).unwrap(), vec![1, 2, 3, 1]);
        assert_eq!(rng.random_bytes(2).unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_fixed_random_empty_pattern_fails() {
        let rng = FixedRandom::new(Vec::new());
        let err = rng.random_bytes(1).expect_err("expected failure");
        assert_eq!(err.kind, Some(ErrorKind::RandomnessUnavailable));
    }
}
