//! Key derivation: password → 256-bit AES key via PBKDF2-HMAC-SHA256

use crate::error::{LockerError, Result};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use std::fmt;
use zeroize::Zeroize;

/// Length of derived key in bytes
pub const KEY_LEN: usize = 32;

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// A derived AES-256 key.
///
/// Zeroized on drop. Scoped to a single encrypt or decrypt call.
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],
}

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive a 32-byte key from a password, salt and iteration count.
///
/// Deterministic: the same inputs always yield the same key. The iteration
/// count is chosen by the caller and has no upper bound here.
pub fn derive_key(password: &str, salt: &[u8], iterations: u32) -> Result<DerivedKey> {
    if iterations == 0 {
        return Err(LockerError::invalid_parameters(
            "iteration count must be at least 1",
        ));
    }
    if salt.is_empty() {
        return Err(LockerError::invalid_parameters("salt must not be empty"));
    }

    let mut bytes = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut bytes);
    Ok(DerivedKey { bytes })
}
