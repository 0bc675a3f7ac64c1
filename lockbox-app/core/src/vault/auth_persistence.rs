//! Persistence for the non-secret authentication settings.
//!
//! The biometric flag and the auto-lock threshold live in the secret store
//! next to the PIN credential, so a reset clears all of them in one place.

use std::sync::Arc;

use tracing::{info, warn};

use lockbox_secret::SecretStore;

use super::error::{VaultError, VaultResult};

pub const BIOMETRIC_ENABLED_ENTRY: &str = "lockbox_biometric_enabled";
pub const AUTO_LOCK_MINUTES_ENTRY: &str = "lockbox_autolock_minutes";

/// Auto-lock threshold used until the user picks one.
pub const DEFAULT_AUTO_LOCK_MINUTES: u32 = 5;

pub struct AuthSettings {
    store: Arc<dyn SecretStore>,
}

impl AuthSettings {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    pub fn set_biometric_enabled(&self, enabled: bool) -> VaultResult<()> {
        self.store
            .set(BIOMETRIC_ENABLED_ENTRY, if enabled { "true" } else { "false" })?;
        info!("Biometric unlock {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    pub fn is_biometric_enabled(&self) -> VaultResult<bool> {
        Ok(self.store.get(BIOMETRIC_ENABLED_ENTRY)?.as_deref() == Some("true"))
    }

    pub fn set_auto_lock_minutes(&self, minutes: u32) -> VaultResult<()> {
        self.store
            .set(AUTO_LOCK_MINUTES_ENTRY, &minutes.to_string())?;
        info!("Auto-lock set to {} minute(s)", minutes);
        Ok(())
    }

    /// Stored threshold, or the default when none was ever set.
    pub fn auto_lock_minutes(&self) -> VaultResult<u32> {
        match self.store.get(AUTO_LOCK_MINUTES_ENTRY)? {
            None => Ok(DEFAULT_AUTO_LOCK_MINUTES),
            Some(raw) => raw.trim().parse().map_err(|e| {
                warn!("Unreadable auto-lock setting {:?}", raw);
                VaultError::KeyStorage(format!("auto-lock setting is corrupt: {}", e))
            }),
        }
    }

    /// Remove both settings. Succeeds when nothing is stored.
    pub fn clear(&self) -> VaultResult<()> {
        self.store.delete(BIOMETRIC_ENABLED_ENTRY)?;
        self.store.delete(AUTO_LOCK_MINUTES_ENTRY)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbox_secret::MemoryStore;

    fn settings() -> (Arc<MemoryStore>, AuthSettings) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), AuthSettings::new(store))
    }

    #[test]
    fn test_defaults_when_nothing_stored() {
        let (_store, settings) = settings();
        assert!(!settings.is_biometric_enabled().unwrap());
        assert_eq!(
            settings.auto_lock_minutes().unwrap(),
            DEFAULT_AUTO_LOCK_MINUTES
        );
    }

    #[test]
    fn test_settings_persist() {
        let (store, settings) = settings();
        settings.set_biometric_enabled(true).unwrap();
        settings.set_auto_lock_minutes(0).unwrap();

        let reopened = AuthSettings::new(store);
        assert!(reopened.is_biometric_enabled().unwrap());
        assert_eq!(reopened.auto_lock_minutes().unwrap(), 0);
    }

    #[test]
    fn test_corrupt_minutes_is_key_storage_error() {
        let (store, settings) = settings();
        store.set(AUTO_LOCK_MINUTES_ENTRY, "five").unwrap();
        assert!(matches!(
            settings.auto_lock_minutes(),
            Err(VaultError::KeyStorage(_))
        ));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (store, settings) = settings();
        settings.set_biometric_enabled(true).unwrap();
        settings.clear().unwrap();
        settings.clear().unwrap();
        assert!(store.is_empty());
    }
}
