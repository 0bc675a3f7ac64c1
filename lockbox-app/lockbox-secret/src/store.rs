//! The secret store abstraction.

use crate::error::Result;
use crate::models::SecretStorageStatus;

/// Durable, OS-protected string key-value storage.
///
/// Implementations must treat `delete` of an absent key as success so that
/// reset paths stay idempotent.
pub trait SecretStore: Send + Sync {
    /// Read the value stored under `key`, or `None` if there is no entry.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Create or overwrite the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the entry stored under `key`.
    fn delete(&self, key: &str) -> Result<()>;

    /// Check whether the backend is usable right now.
    fn check_availability(&self) -> SecretStorageStatus;
}
