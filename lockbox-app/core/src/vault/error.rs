//! Vault-specific error types for the security subsystem.
//!
//! Each variant maps to one failure mode a caller has to present differently
//! to the user. A failed PIN check inside `verify_pin` is not an error; it is
//! reported as `Ok(false)`.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur during vault operations.
#[derive(Error, Debug)]
pub enum VaultError {
    /// The secret store is unavailable or holds something unreadable.
    #[error("Key storage error: {0}")]
    KeyStorage(String),

    /// AEAD authentication failed: wrong key, wrong nonce, or the blob was
    /// truncated or tampered with. No plaintext is ever returned.
    #[error("Decryption failed: data is corrupted or was encrypted under another key")]
    DecryptionFailure,

    /// PIN is not 4-6 ASCII digits.
    #[error("Invalid PIN format: {0}")]
    InvalidPinFormat(String),

    /// The PIN given for a change did not match the stored credential.
    #[error("PIN does not match")]
    PinMismatch,

    /// Biometrics are disabled, missing hardware, or not enrolled.
    #[error("Biometric authentication unavailable: {0}")]
    BiometricUnavailable(String),

    /// The user dismissed the biometric prompt.
    #[error("Biometric authentication cancelled")]
    BiometricCancelled,

    /// Read/write/delete failure on a vault or scratch path.
    #[error("File I/O error on {path:?}: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No PIN has been created yet.
    #[error("Vault not set up")]
    NotSetUp,

    /// A PIN already exists; use `change_pin` instead.
    #[error("Vault already set up")]
    AlreadySetUp,

    /// The operation needs the vault to be unlocked.
    #[error("Vault is locked")]
    Locked,

    /// Lockout policy is active after repeated PIN failures.
    #[error("Too many failed PIN attempts, retry in {retry_after_secs}s")]
    TooManyAttempts { retry_after_secs: u64 },

    /// A blob name handed in by a caller is not one we could have generated.
    #[error("Invalid blob name: {0}")]
    InvalidBlobName(String),

    /// An error occurred in the encryption layer.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Key derivation failed (Argon2 error).
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
}

impl VaultError {
    pub fn file_io(path: &Path, source: std::io::Error) -> Self {
        VaultError::FileIo {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Stable code for UI layers.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::KeyStorage(_) => "KEY_STORAGE_ERROR",
            VaultError::DecryptionFailure => "DECRYPTION_FAILURE",
            VaultError::InvalidPinFormat(_) => "INVALID_PIN_FORMAT",
            VaultError::PinMismatch => "PIN_MISMATCH",
            VaultError::BiometricUnavailable(_) => "BIOMETRIC_UNAVAILABLE",
            VaultError::BiometricCancelled => "BIOMETRIC_CANCELLED",
            VaultError::FileIo { .. } => "FILE_IO_ERROR",
            VaultError::NotSetUp => "NOT_SET_UP",
            VaultError::AlreadySetUp => "ALREADY_SET_UP",
            VaultError::Locked => "LOCKED",
            VaultError::TooManyAttempts { .. } => "TOO_MANY_ATTEMPTS",
            VaultError::InvalidBlobName(_) => "INVALID_BLOB_NAME",
            VaultError::Encryption(_) => "ENCRYPTION_ERROR",
            VaultError::KeyDerivation(_) => "KEY_DERIVATION_ERROR",
        }
    }
}

impl From<lockbox_secret::Error> for VaultError {
    fn from(err: lockbox_secret::Error) -> Self {
        VaultError::KeyStorage(err.to_string())
    }
}

/// Result type alias for vault operations.
pub type VaultResult<T> = std::result::Result<T, VaultError>;

// ============================================================================
// Serialization for UI layers
// ============================================================================

impl serde::Serialize for VaultError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("VaultError", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
