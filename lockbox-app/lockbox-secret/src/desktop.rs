//! Desktop implementation using OS keyring.
//!
//! This module provides secure secret storage using platform-native keyrings:
//! - **macOS**: Keychain Access
//! - **Windows**: Credential Manager
//! - **Linux**: Secret Service API (GNOME Keyring, KWallet)

use keyring::Entry;
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::models::{SecretStorageMethod, SecretStorageStatus};
use crate::store::SecretStore;

/// Account used by `check_availability` to test the keyring.
const AVAILABILITY_ACCOUNT: &str = "availability-check";

/// Secret store backed by the OS keyring. Each key maps to one keyring
/// entry (account) under a shared service name.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).map_err(|e| {
            error!("Failed to create keyring entry for {}: {}", key, e);
            Self::map_keyring_error(e)
        })
    }

    /// Get the appropriate storage method for the current platform.
    fn get_platform_method() -> SecretStorageMethod {
        #[cfg(target_os = "macos")]
        {
            SecretStorageMethod::MacOSKeychain
        }
        #[cfg(target_os = "windows")]
        {
            SecretStorageMethod::WindowsCredentialManager
        }
        #[cfg(target_os = "linux")]
        {
            SecretStorageMethod::LinuxSecretService
        }
    }

    /// Map keyring errors to our error type.
    fn map_keyring_error(err: keyring::Error) -> Error {
        match err {
            keyring::Error::Ambiguous(_) => {
                Error::Internal("Multiple keyring entries found".into())
            }
            keyring::Error::NoStorageAccess(e) => {
                warn!("Keyring access denied: {:?}", e);
                Error::AccessDenied
            }
            keyring::Error::PlatformFailure(e) => {
                let msg = format!("{:?}", e);
                if msg.contains("Dbus") || msg.contains("dbus") || msg.contains("D-Bus") {
                    Error::NotAvailable(format!(
                        "System keyring not available (D-Bus error): {}",
                        msg
                    ))
                } else {
                    Error::Internal(format!("Keyring error: {:?}", e))
                }
            }
            keyring::Error::BadEncoding(e) => {
                Error::Internal(format!("Keyring encoding error: {:?}", e))
            }
            _ => Error::Internal(format!("Keyring error: {}", err)),
        }
    }
}

impl SecretStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => {
                debug!("Read {} from keyring ({} chars)", key, value.len());
                Ok(Some(value))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => {
                error!("Failed to read {} from keyring: {:?}", key, e);
                Err(Self::map_keyring_error(e))
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?.set_password(value).map_err(|e| {
            error!("Failed to store {} in keyring: {:?}", key, e);
            Self::map_keyring_error(e)
        })?;

        // Read back through a fresh Entry so we don't trust a cached value
        match self.entry(key)?.get_password() {
            Ok(readback) if readback == value => {
                debug!("Stored {} in keyring (service: {})", key, self.service);
                Ok(())
            }
            Ok(_) => {
                error!("Keyring verification failed for {} - data mismatch", key);
                Err(Error::Internal(
                    "Keyring verification failed: data mismatch".into(),
                ))
            }
            Err(e) => Err(Error::Internal(format!(
                "Keyring verification failed: stored {} but could not read it back: {:?}",
                key, e
            ))),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => {
                debug!("Deleted {} from keyring", key);
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No {} in keyring to delete", key);
                Ok(())
            }
            Err(e) => {
                error!("Failed to delete {} from keyring: {:?}", key, e);
                Err(Self::map_keyring_error(e))
            }
        }
    }

    fn check_availability(&self) -> SecretStorageStatus {
        let entry = match Entry::new(&self.service, AVAILABILITY_ACCOUNT) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Keyring not available: {}", e);
                return SecretStorageStatus::unavailable(format!(
                    "OS keyring not available: {}",
                    e
                ));
            }
        };
        let method = Self::get_platform_method();
        match entry.get_password() {
            Ok(_) | Err(keyring::Error::NoEntry) => {
                debug!("Keyring available, method: {:?}", method);
                SecretStorageStatus::available(method)
            }
            Err(e) => {
                warn!("Keyring not accessible: {:?}", e);
                SecretStorageStatus::unavailable(format!("OS keyring not accessible: {}", e))
            }
        }
    }
}
