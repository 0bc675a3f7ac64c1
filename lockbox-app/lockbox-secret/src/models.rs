//! Data types shared by the secret store and biometric backends.

use serde::{Deserialize, Serialize};

/// The method used for secure secret storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SecretStorageMethod {
    /// macOS Keychain.
    MacOSKeychain,
    /// Windows Credential Manager.
    WindowsCredentialManager,
    /// Linux Secret Service API (GNOME Keyring, KWallet, etc.)
    LinuxSecretService,
    /// Process memory only. Nothing survives a restart.
    InMemory,
}

/// Status of secure secret storage availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretStorageStatus {
    /// Whether secure storage is available and can be used.
    pub available: bool,
    /// The method that will be used (if available).
    pub method: Option<SecretStorageMethod>,
    /// Why secure storage is unavailable (if not available).
    pub unavailable_reason: Option<String>,
}

impl SecretStorageStatus {
    /// Create a status indicating secure storage is available.
    pub fn available(method: SecretStorageMethod) -> Self {
        Self {
            available: true,
            method: Some(method),
            unavailable_reason: None,
        }
    }

    /// Create a status indicating secure storage is unavailable.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            method: None,
            unavailable_reason: Some(reason.into()),
        }
    }
}

/// A biometric modality the device can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BiometricKind {
    Fingerprint,
    FacialRecognition,
    Iris,
}

/// Result of a biometric prompt.
///
/// `Failure` means the user was presented the prompt and did not match;
/// `Cancelled` means the prompt was dismissed (by the user or the system).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BiometricOutcome {
    Success,
    Failure,
    Cancelled,
}
