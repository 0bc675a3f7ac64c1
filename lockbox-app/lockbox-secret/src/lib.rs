//! Platform secret storage and biometric delegation.
//!
//! The vault core treats both collaborators as opaque: a durable string
//! key-value store with OS-level at-rest protection, and a biometric prompt
//! that reports a single outcome.

#[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux"))]
mod desktop;

mod biometric;
mod error;
mod memory;
mod models;
mod store;

pub use biometric::{biometric_label, BiometricProvider, NoBiometrics};
#[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux"))]
pub use desktop::KeyringStore;
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use models::*;
pub use store::SecretStore;
