//! Error types for secret storage and biometric operations.

use serde::{Deserialize, Serialize};

/// Result type alias for secret storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to platform secret storage.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", content = "message")]
pub enum Error {
    /// Secure storage is not available on this platform/device.
    #[error("Secure storage not available: {0}")]
    NotAvailable(String),

    /// Access to secure storage was denied by the OS.
    #[error("Access denied to secure storage")]
    AccessDenied,

    /// The platform rejected the presented biometric.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Enrollment was removed after the provider reported availability.
    #[error("No biometrics enrolled on this device")]
    NoBiometricsEnrolled,

    /// Platform-specific internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
