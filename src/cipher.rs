//! AES-256-GCM sealing and opening
//!
//! The output of [`seal`] is the ciphertext with the 16-byte GCM tag
//! appended. [`open`] verifies the tag before returning anything; on any
//! mismatch no plaintext is exposed.

use crate::error::{ErrorCategory, ErrorKind, LockerError, Result};
use crate::kdf::DerivedKey;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};

/// Length of the GCM nonce in bytes
pub const NONCE_LEN: usize = 12;

/// Length of the GCM authentication tag in bytes
pub const TAG_LEN: usize = 16;

/// Progress percentage reported once the cipher call has completed.
pub const PROGRESS_DONE: u8 = 100;

/// Receives progress percentages in `[0, 100]`, non-decreasing, ending at 100.
pub type ProgressFn<'a> = &'a mut dyn FnMut(u8);

/// Uniform message for every tag verification failure.
pub const AUTHENTICATION_FAILED_MSG: &str =
    "decryption failed: wrong password, corrupted file, or tampered data";

fn cipher_for(key: &DerivedKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

/// Encrypt `plaintext` under `key` and `nonce`, returning ciphertext || tag.
pub fn seal(
    plaintext: &[u8],
    key: &DerivedKey,
    nonce: &[u8; NONCE_LEN],
    on_progress: Option<ProgressFn<'_>>,
) -> Result<Vec<u8>> {
    let sealed = cipher_for(key)
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| {
            LockerError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::CipherFailure,
                format!("encryption failed: {}", e),
            )
        })?;

    if let Some(report) = on_progress {
        report(PROGRESS_DONE);
    }
    Ok(sealed)
}

/// Verify and decrypt ciphertext || tag under `key` and `nonce`.
pub fn open(
    sealed: &[u8],
    key: &DerivedKey,
    nonce: &[u8; NONCE_LEN],
    on_progress: Option<ProgressFn<'_>>,
) -> Result<Vec<u8>> {
    if sealed.len() < TAG_LEN {
        return Err(LockerError::with_kind(
            ErrorCategory::User,
            ErrorKind::TruncatedInput,
            "ciphertext shorter than the authentication tag",
        ));
    }

    let plaintext = cipher_for(key)
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| {
            LockerError::with_kind(
                ErrorCategory::User,
                ErrorKind::AuthenticationFailed,
                AUTHENTICATION_FAILED_MSG,
            )
        })?;

    if let Some(report) = on_progress {
        report(PROGRESS_DONE);
    }
    Ok(plaintext)
}
