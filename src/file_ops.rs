//! File encryption/decryption operations
//!
//! This module provides the on-disk flows around [`Locker`]: reading the
//! input, applying the password policy, building or parsing the `.sfl`
//! package and writing the result.

use crate::error::{ErrorCategory, ErrorKind, LockerError, Result};
use crate::locker::Locker;
use crate::package::{self, Algorithm, EncryptionMetadata};
use crate::passphrase::PassphraseReader;
use crate::random::SecureRandom;
use crate::strength::{self, MIN_PASSWORD_LENGTH};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Encrypt a file with a password
///
/// Reads plaintext from `input_path`, encrypts it using a password from
/// `passphrase_reader`, and writes the package to `output_path`, or to
/// `<input>.sfl` when no output is given. Returns the path written.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn encrypt_file<R: SecureRandom>(
    locker: &Locker<R>,
    input_path: &Path,
    output_path: Option<&Path>,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<PathBuf> {
    let plaintext = Zeroizing::new(fs::read(input_path).map_err(|e| read_error(input_path, e))?);
    let original_name = input_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            LockerError::with_kind(
                ErrorCategory::User,
                ErrorKind::Io,
                format!("{} does not name a file", input_path.display()),
            )
        })?;
    let output_path = match output_path {
        Some(p) => p.to_path_buf(),
        None => input_path.with_file_name(package::package_file_name(&original_name)),
    };

    let passphrase = passphrase_reader.read_passphrase()?;
    enforce_password_policy(&passphrase)?;

    let (ciphertext, metadata) = locker
        .encrypt_file(
            &plaintext,
            &original_name,
            &passphrase,
            Algorithm::Aes256Gcm,
            Some(&mut |p: u8| debug!(progress = p, "encrypt progress")),
        )
        .map_err(|e| e.with_context("encryption failed"))?;
    let package = package::build_package(&ciphertext, &metadata)?;
    write_file_secure(&output_path, &package)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        size = metadata.size,
        "encrypted file"
    );
    Ok(output_path)
}

/// Decrypt a package with a password
///
/// Rejects inputs without the `.sfl` extension before reading them. Writes
/// the plaintext to `output_path`, or next to the input under the original
/// file name recorded in the package. Returns the path written.
///
/// A default output path that already exists is never replaced; pass
/// `output_path` explicitly to overwrite.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn decrypt_file<R: SecureRandom>(
    locker: &Locker<R>,
    input_path: &Path,
    output_path: Option<&Path>,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<PathBuf> {
    package::ensure_package_extension(input_path)?;
    let package_bytes = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let (metadata, ciphertext) = package::parse_package(&package_bytes)
        .map_err(|e| e.with_context(format!("{} is not a valid package", input_path.display())))?;

    // A name taken from the package never replaces an existing file.
    let (output_path, overwrite) = match output_path {
        Some(p) => (p.to_path_buf(), true),
        None => (restored_path(input_path, &metadata)?, false),
    };

    let passphrase = passphrase_reader.read_passphrase()?;
    let plaintext = Zeroizing::new(
        locker
            .decrypt_file(
                &ciphertext,
                &metadata,
                &passphrase,
                Some(&mut |p: u8| debug!(progress = p, "decrypt progress")),
            )
            .map_err(|e| e.with_context("failed to decrypt"))?,
    );
    let written = if overwrite {
        write_file_secure(&output_path, &plaintext)
    } else {
        write_file_new(&output_path, &plaintext)
    };
    written.map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        original_name = %metadata.original_name,
        "decrypted file"
    );
    Ok(output_path)
}

/// Update an encrypted file with new plaintext using the same password
///
/// This function:
/// 1. Decrypts the existing package at `crypt_path` to validate the password
/// 2. Reads new plaintext from `plain_path`
/// 3. Encrypts the new plaintext with the validated password, fresh salt and
///    nonce, keeping the recorded original file name
/// 4. Atomically writes to `crypt_path` (tempfile + fsync + rename)
///
/// The atomic write ensures that either the old file or the new file exists,
/// never a partial/corrupted file.
///
/// The password validation prevents accidental password changes.
pub fn update_file<R: SecureRandom>(
    locker: &Locker<R>,
    plain_path: &Path,
    crypt_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    package::ensure_package_extension(crypt_path)?;
    let package_bytes = fs::read(crypt_path).map_err(|e| read_error(crypt_path, e))?;
    let (old_metadata, old_ciphertext) = package::parse_package(&package_bytes)
        .map_err(|e| e.with_context(format!("{} is not a valid package", crypt_path.display())))?;
    let passphrase = passphrase_reader.read_passphrase()?;
    enforce_password_policy(&passphrase)?;

    // Validate password by decrypting existing file (discard plaintext)
    drop(Zeroizing::new(
        locker
            .decrypt_file(&old_ciphertext, &old_metadata, &passphrase, None)
            .map_err(|e| e.with_context("failed to decrypt"))?,
    ));

    // Great, let's re-write it (atomically).
    let crypt_dir = match crypt_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        Some(_) => Path::new("."),
        None => {
            return Err(LockerError::with_kind(
                ErrorCategory::User,
                ErrorKind::Io,
                "crypt_path has no parent directory",
            ));
        }
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(crypt_dir).map_err(|e| {
        LockerError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to create tempfile",
            e,
        )
    })?;
    let new_plaintext = Zeroizing::new(fs::read(plain_path).map_err(|e| read_error(plain_path, e))?);
    let (new_ciphertext, new_metadata) = locker
        .encrypt_file(
            &new_plaintext,
            &old_metadata.original_name,
            &passphrase,
            old_metadata.algorithm,
            None,
        )
        .map_err(|e| e.with_context("failed to encrypt"))?;
    let new_package = package::build_package(&new_ciphertext, &new_metadata)?;

    temp_file.write_all(&new_package).map_err(|e| {
        LockerError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to write to tempfile",
            e,
        )
    })?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file.flush().map_err(|e| {
        LockerError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to flush tempfile",
            e,
        )
    })?;
    temp_file.as_file().sync_all().map_err(|e| {
        LockerError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    // NamedTempFile is already created 0o600 on Unix.
    temp_file.persist(crypt_path).map_err(|e| {
        LockerError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", crypt_path.display()),
            e,
        )
    })?;

    info!(
        input = %plain_path.display(),
        output = %crypt_path.display(),
        size = new_metadata.size,
        "updated encrypted file"
    );
    Ok(())
}

/// Read the metadata header of a package without decrypting it.
pub fn inspect_file(input_path: &Path) -> Result<EncryptionMetadata> {
    package::ensure_package_extension(input_path)?;
    let package_bytes = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let (metadata, _) = package::parse_package(&package_bytes)
        .map_err(|e| e.with_context(format!("{} is not a valid package", input_path.display())))?;
    Ok(metadata)
}

/// Where a decrypted package is written when no output is given.
///
/// Only the final component of the recorded name is used, so a crafted
/// package cannot direct output outside the input's directory.
fn restored_path(input_path: &Path, metadata: &EncryptionMetadata) -> Result<PathBuf> {
    let name = match Path::new(&metadata.original_name).file_name() {
        Some(name) => name.to_os_string(),
        None => input_path.file_stem().map(|s| s.to_os_string()).ok_or_else(|| {
            LockerError::with_kind(
                ErrorCategory::User,
                ErrorKind::Io,
                "cannot determine an output file name; pass one explicitly",
            )
        })?,
    };
    let restored = input_path.with_file_name(name);
    if restored == input_path {
        return Err(LockerError::with_kind(
            ErrorCategory::User,
            ErrorKind::Io,
            format!(
                "refusing to overwrite {} with its decrypted contents",
                input_path.display()
            ),
        ));
    }
    Ok(restored)
}

fn enforce_password_policy(passphrase: &str) -> Result<()> {
    if strength::meets_minimum_length(passphrase) {
        Ok(())
    } else {
        Err(LockerError::with_kind(
            ErrorCategory::User,
            ErrorKind::WeakPassword,
            format!(
                "password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            ),
        ))
    }
}

/// Write a file that must not already exist, atomically.
///
/// The contents go to a tempfile (mode 0o600 on Unix) in the target's
/// directory, which is synced and then linked into place without clobbering.
fn write_file_new(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        LockerError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to create tempfile",
            e,
        )
    })?;
    temp_file
        .write_all(contents)
        .and_then(|_| temp_file.as_file().sync_all())
        .map_err(|e| {
            LockerError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "failed to write to tempfile",
                e,
            )
        })?;

    temp_file.persist_noclobber(path).map_err(|e| {
        if e.error.kind() == io::ErrorKind::AlreadyExists {
            LockerError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Io,
                format!(
                    "refusing to overwrite existing {}; pass an output path explicitly",
                    path.display()
                ),
                e.error,
            )
        } else {
            LockerError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to move tempfile to {}", path.display()),
                e.error,
            )
        }
    })?;
    Ok(())
}

/// Write file with secure permissions (0o600 on Unix)
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    #[cfg(unix)]
    {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| {
                LockerError::with_kind_and_source(
                    ErrorCategory::User,
                    ErrorKind::Io,
                    format!("failed to open {}", path.display()),
                    e,
                )
            })?;

        file.write_all(contents).map_err(|e| {
            LockerError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to write {}", path.display()),
                e,
            )
        })?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents).map_err(|e| {
            LockerError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Io,
                format!("failed to write {}", path.display()),
                e,
            )
        })?;
        Ok(())
    }
}

fn read_error(path: &Path, err: io::Error) -> LockerError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    LockerError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}
