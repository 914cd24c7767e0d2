//! Password-based encryption of whole files held in memory
//!
//! [`Locker`] ties the pieces together: it draws a fresh salt and nonce from
//! its random source for every encryption, derives the key, seals the
//! plaintext and records everything needed to reverse it in
//! [`EncryptionMetadata`]. It never touches the filesystem.

use crate::cipher::{self, NONCE_LEN, ProgressFn};
use crate::error::{ErrorCategory, ErrorKind, LockerError, Result};
use crate::kdf::{self, SALT_LEN};
use crate::package::{Algorithm, EncryptionMetadata, FORMAT_VERSION, Kdf};
use crate::random::{OsRandom, SecureRandom};
use chrono::{SecondsFormat, Utc};
use tracing::debug;

/// PBKDF2 iteration count used for new packages.
pub const DEFAULT_ITERATIONS: u32 = 310_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockerConfig {
    /// PBKDF2 iterations for new packages. Existing packages carry their own.
    pub iterations: u32,
}

impl Default for LockerConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// Encrypts and decrypts file contents under a password.
///
/// Stateless between calls apart from the random source; each call owns its
/// key, nonce and buffers.
#[derive(Debug)]
pub struct Locker<R: SecureRandom = OsRandom> {
    rng: R,
    config: LockerConfig,
}

impl Locker<OsRandom> {
    /// A locker using the operating system's generator and default settings.
    pub fn new() -> Self {
        Self::with_random(OsRandom, LockerConfig::default())
    }

    pub fn with_config(config: LockerConfig) -> Self {
        Self::with_random(OsRandom, config)
    }
}

impl Default for Locker<OsRandom> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: SecureRandom> Locker<R> {
    pub fn with_random(rng: R, config: LockerConfig) -> Self {
        Self { rng, config }
    }

    pub fn config(&self) -> &LockerConfig {
        &self.config
    }

    /// Encrypt `plaintext` under `password`.
    ///
    /// Returns ciphertext (with tag) and the metadata needed to decrypt it.
    /// `on_progress`, if given, is called once with 100 on success.
    pub fn encrypt_file(
        &self,
        plaintext: &[u8],
        original_name: &str,
        password: &str,
        algorithm: Algorithm,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<(Vec<u8>, EncryptionMetadata)> {
        check_password(password)?;
        if self.config.iterations == 0 {
            return Err(LockerError::invalid_parameters(
                "iteration count must be at least 1",
            ));
        }

        let salt: [u8; SALT_LEN] = self.rng.random_array()?;
        let iv: [u8; NONCE_LEN] = self.rng.random_array()?;

        debug!(
            size = plaintext.len(),
            iterations = self.config.iterations,
            algorithm = algorithm.as_str(),
            "encrypting"
        );

        let key = kdf::derive_key(password, &salt, self.config.iterations)?;
        let ciphertext = match algorithm {
            Algorithm::Aes256Gcm => cipher::seal(plaintext, &key, &iv, on_progress)?,
        };

        let metadata = EncryptionMetadata {
            version: FORMAT_VERSION.to_string(),
            algorithm,
            kdf: Kdf::Pbkdf2,
            salt,
            iterations: self.config.iterations,
            iv,
            original_name: original_name.to_string(),
            size: plaintext.len() as u64,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        Ok((ciphertext, metadata))
    }

    /// Decrypt `ciphertext` produced by [`Locker::encrypt_file`].
    ///
    /// Fails with [`ErrorKind::AuthenticationFailed`] on a wrong password or
    /// any corruption, without returning partial plaintext.
    pub fn decrypt_file(
        &self,
        ciphertext: &[u8],
        metadata: &EncryptionMetadata,
        password: &str,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<Vec<u8>> {
        check_password(password)?;

        debug!(
            size = ciphertext.len(),
            iterations = metadata.iterations,
            "decrypting"
        );

        let key = kdf::derive_key(password, &metadata.salt, metadata.iterations)?;
        let plaintext = match metadata.algorithm {
            Algorithm::Aes256Gcm => cipher::open(ciphertext, &key, &metadata.iv, on_progress)?,
        };

        if plaintext.len() as u64 != metadata.size {
            return Err(LockerError::with_kind(
                ErrorCategory::User,
                ErrorKind::SizeMismatch,
                format!(
                    "decrypted {} bytes but metadata records {}",
                    plaintext.len(),
                    metadata.size
                ),
            ));
        }

        Ok(plaintext)
    }
}

fn check_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(LockerError::invalid_parameters("password must not be empty"));
    }
    Ok(())
}
