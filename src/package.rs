//! The `.sfl` package container
//!
//! The binary format is:
//! - metadata length: 4 bytes (little-endian u32) = L
//! - metadata: L bytes of compact UTF-8 JSON
//! - ciphertext: remaining bytes (includes the 16-byte GCM tag)
//!
//! The codec does not look inside the ciphertext; a body too short to hold
//! a tag is rejected when it is opened.
//!
//! Salt and nonce are JSON arrays of integers, not base64, for
//! compatibility with packages produced by the web version.

use crate::cipher::NONCE_LEN;
use crate::error::{ErrorCategory, ErrorKind, LockerError, Result};
use crate::kdf::SALT_LEN;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The only format version this crate reads or writes.
pub const FORMAT_VERSION: &str = "1.0";

/// File extension (without the dot) carried by every package.
pub const PACKAGE_EXTENSION: &str = "sfl";

/// Size of the metadata length prefix in bytes.
const LENGTH_PREFIX_LEN: usize = 4;

/// Cipher used to seal the package body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Algorithm {
    #[default]
    #[serde(rename = "AES-256-GCM")]
    Aes256Gcm,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Aes256Gcm => "AES-256-GCM",
        }
    }
}

/// Key derivation function. PBKDF2 always uses HMAC-SHA-256.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Kdf {
    #[default]
    #[serde(rename = "PBKDF2")]
    Pbkdf2,
}

/// Everything needed, besides the password, to reverse an encryption.
///
/// Created once per encryption and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionMetadata {
    pub version: String,
    pub algorithm: Algorithm,
    pub kdf: Kdf,
    pub salt: [u8; SALT_LEN],
    pub iterations: u32,
    pub iv: [u8; NONCE_LEN],
    pub original_name: String,
    pub size: u64,
    pub created_at: String,
}

/// Serialize `metadata` and concatenate it with `ciphertext` into a package.
pub fn build_package(ciphertext: &[u8], metadata: &EncryptionMetadata) -> Result<Vec<u8>> {
    let header = serde_json::to_vec(metadata).map_err(|e| {
        LockerError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "failed to serialize metadata",
            e,
        )
    })?;
    let header_len = u32::try_from(header.len()).map_err(|_| {
        LockerError::invalid_parameters("metadata does not fit in a 32-bit length prefix")
    })?;

    let mut package = Vec::with_capacity(LENGTH_PREFIX_LEN + header.len() + ciphertext.len());
    package.extend_from_slice(&header_len.to_le_bytes());
    package.extend_from_slice(&header);
    package.extend_from_slice(ciphertext);
    Ok(package)
}

/// Split a package into its metadata and ciphertext.
pub fn parse_package(package: &[u8]) -> Result<(EncryptionMetadata, Vec<u8>)> {
    let Some((prefix, rest)) = package.split_first_chunk::<LENGTH_PREFIX_LEN>() else {
        return Err(LockerError::with_kind(
            ErrorCategory::User,
            ErrorKind::TruncatedInput,
            "input likely truncated while reading metadata length",
        ));
    };

    // A length that does not fit in usize cannot fit in the input either.
    let header_len = usize::try_from(u32::from_le_bytes(*prefix)).unwrap_or(usize::MAX);
    if header_len > rest.len() {
        return Err(LockerError::with_kind(
            ErrorCategory::User,
            ErrorKind::TruncatedInput,
            "truncated or corrupt input; claimed metadata length greater than available input",
        ));
    }
    let (header, ciphertext) = rest.split_at(header_len);

    let metadata = decode_metadata(header)?;
    Ok((metadata, ciphertext.to_vec()))
}

fn decode_metadata(header: &[u8]) -> Result<EncryptionMetadata> {
    let text = std::str::from_utf8(header).map_err(|e| {
        LockerError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::PackageFormat,
            "metadata is not valid UTF-8",
            e,
        )
    })?;

    // Check the version first so a future format is reported as such rather
    // than as a missing or unknown field.
    let raw: serde_json::Value = serde_json::from_str(text).map_err(|e| {
        LockerError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::PackageFormat,
            format!("metadata is not valid JSON: {}", e),
            e,
        )
    })?;
    match raw.get("version").and_then(|v| v.as_str()) {
        Some(FORMAT_VERSION) => {}
        Some(other) => {
            return Err(LockerError::with_kind(
                ErrorCategory::User,
                ErrorKind::UnsupportedVersion,
                format!("unsupported package version {:?}", other),
            ));
        }
        None => {
            return Err(LockerError::with_kind(
                ErrorCategory::User,
                ErrorKind::PackageFormat,
                "metadata is missing the version field",
            ));
        }
    }

    let metadata: EncryptionMetadata = serde_json::from_value(raw).map_err(|e| {
        LockerError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::PackageFormat,
            format!("invalid metadata: {}", e),
            e,
        )
    })?;

    if metadata.iterations == 0 {
        return Err(LockerError::with_kind(
            ErrorCategory::User,
            ErrorKind::PackageFormat,
            "invalid metadata: iteration count must be at least 1",
        ));
    }

    Ok(metadata)
}

/// True if `path` ends in `.sfl`.
pub fn has_package_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == PACKAGE_EXTENSION)
}

/// Reject paths that are not named like packages, before reading them.
pub fn ensure_package_extension(path: &Path) -> Result<()> {
    if has_package_extension(path) {
        Ok(())
    } else {
        Err(LockerError::with_kind(
            ErrorCategory::User,
            ErrorKind::MissingExtension,
            format!(
                "{} is not a .{} encrypted file",
                path.display(),
                PACKAGE_EXTENSION
            ),
        ))
    }
}

/// The package file name for an original file name (`report.pdf` → `report.pdf.sfl`).
pub fn package_file_name(original_name: &str) -> String {
    format!("{}.{}", original_name, PACKAGE_EXTENSION)
}
