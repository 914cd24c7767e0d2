//! Secure File Locker - password-based file encryption using PBKDF2-HMAC-SHA256
//! and AES-256-GCM, packaged in the `.sfl` container format.

#![forbid(unsafe_code)]

pub mod cipher;
pub mod error;
pub mod file_ops;
pub mod kdf;
pub mod locker;
pub mod package;
pub mod passphrase;
pub mod random;
pub mod strength;

pub use error::{ErrorCategory, ErrorKind, LockerError, Result};
pub use locker::{DEFAULT_ITERATIONS, Locker, LockerConfig};
pub use package::{Algorithm, EncryptionMetadata, Kdf, build_package, parse_package};
