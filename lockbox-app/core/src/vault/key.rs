//! Master key lifecycle.
//!
//! One random 256-bit key encrypts every document blob. It lives in the
//! platform secret store (base64) and is mirrored in process memory so each
//! encrypt/decrypt does not have to go back to the keyring.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use parking_lot::Mutex;
use rand::RngCore;
use tracing::{debug, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use lockbox_secret::SecretStore;

use super::error::{VaultError, VaultResult};

/// Secret store entry holding the base64-encoded master key.
pub const MASTER_KEY_ENTRY: &str = "lockbox_master_key";

/// Master key length in bytes (AES-256).
pub const MASTER_KEY_LEN: usize = 32;

/// A 256-bit encryption key with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    key: [u8; MASTER_KEY_LEN],
}

impl MasterKey {
    fn generate() -> Self {
        let mut key = [0u8; MASTER_KEY_LEN];
        rand::rng().fill_bytes(&mut key);
        Self { key }
    }

    fn from_encoded(encoded: &str) -> VaultResult<Self> {
        let bytes = Zeroizing::new(STANDARD.decode(encoded.trim()).map_err(|e| {
            VaultError::KeyStorage(format!("stored master key is not valid base64: {}", e))
        })?);
        if bytes.len() != MASTER_KEY_LEN {
            return Err(VaultError::KeyStorage(format!(
                "stored master key has {} bytes, expected {}",
                bytes.len(),
                MASTER_KEY_LEN
            )));
        }
        let mut key = [0u8; MASTER_KEY_LEN];
        key.copy_from_slice(&bytes);
        Ok(Self { key })
    }

    fn encode(&self) -> Zeroizing<String> {
        Zeroizing::new(STANDARD.encode(self.key))
    }

    /// Get the key as a byte slice for cryptographic operations.
    pub fn as_bytes(&self) -> &[u8; MASTER_KEY_LEN] {
        &self.key
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log the actual key material
        f.debug_struct("MasterKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Token required by [`MasterKeyManager::delete_key`].
#[derive(Debug)]
pub struct IrreversibleDeletion(());

impl IrreversibleDeletion {
    pub fn acknowledge_all_documents_lost() -> Self {
        IrreversibleDeletion(())
    }
}

/// Owns the single master key of a vault.
///
/// Construct once and share by `Arc`. The cache mutex is held across the
/// secret-store round trip in [`ensure_key`](Self::ensure_key), so concurrent
/// first-time callers can never generate two different keys.
pub struct MasterKeyManager {
    store: Arc<dyn SecretStore>,
    cache: Mutex<Option<MasterKey>>,
}

impl MasterKeyManager {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            cache: Mutex::new(None),
        }
    }

    /// Return the master key, loading or creating it on first use.
    ///
    /// Order: memory cache, then secret store, then a fresh key from the OS
    /// CSPRNG which is persisted before it is returned. A stored key that
    /// cannot be decoded is an error, never a reason to generate a new one.
    pub fn ensure_key(&self) -> VaultResult<MasterKey> {
        let mut cache = self.cache.lock();
        if let Some(key) = cache.as_ref() {
            return Ok(key.clone());
        }

        let key = match self.store.get(MASTER_KEY_ENTRY)? {
            Some(encoded) => {
                debug!("Loaded master key from secret store");
                MasterKey::from_encoded(&encoded)?
            }
            None => {
                info!("No master key found - generating new one");
                let key = MasterKey::generate();
                self.store.set(MASTER_KEY_ENTRY, &key.encode())?;
                info!("Master key stored in secret store");
                key
            }
        };

        *cache = Some(key.clone());
        Ok(key)
    }

    /// Evict the in-memory copy. The persisted key is untouched.
    pub fn clear_cache(&self) {
        if self.cache.lock().take().is_some() {
            debug!("Master key evicted from memory cache");
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cache.lock().is_some()
    }

    /// Whether a master key has been persisted (first run detection).
    pub fn has_key(&self) -> VaultResult<bool> {
        Ok(self.store.get(MASTER_KEY_ENTRY)?.is_some())
    }

    /// Permanently erase the master key from the secret store and memory.
    ///
    /// Every blob encrypted so far becomes undecryptable. There is no
    /// recovery path.
    pub fn delete_key(&self, _ack: IrreversibleDeletion) -> VaultResult<()> {
        let mut cache = self.cache.lock();
        self.store.delete(MASTER_KEY_ENTRY)?;
        *cache = None;
        warn!("Master key deleted - all encrypted documents are now unrecoverable");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbox_secret::MemoryStore;

    fn manager() -> (Arc<MemoryStore>, MasterKeyManager) {
        let store = Arc::new(MemoryStore::new());
        let manager = MasterKeyManager::new(store.clone());
        (store, manager)
    }

    #[test]
    fn test_ensure_key_generates_and_persists_once() {
        let (store, manager) = manager();
        assert!(!manager.has_key().unwrap());

        let first = manager.ensure_key().unwrap();
        let second = manager.ensure_key().unwrap();

        assert_eq!(first.as_bytes(), second.as_bytes());
        assert!(manager.has_key().unwrap());
        let stored = store.get(MASTER_KEY_ENTRY).unwrap().unwrap();
        assert_eq!(STANDARD.decode(stored).unwrap(), first.as_bytes().to_vec());
    }

    #[test]
    fn test_clear_cache_keeps_persisted_key() {
        let (_store, manager) = manager();
        let original = manager.ensure_key().unwrap();
        assert!(manager.is_cached());

        manager.clear_cache();
        assert!(!manager.is_cached());

        let reloaded = manager.ensure_key().unwrap();
        assert_eq!(original.as_bytes(), reloaded.as_bytes());
    }

    #[test]
    fn test_second_manager_reads_existing_key() {
        let store = Arc::new(MemoryStore::new());
        let a = MasterKeyManager::new(store.clone());
        let b = MasterKeyManager::new(store);
        assert_eq!(
            a.ensure_key().unwrap().as_bytes(),
            b.ensure_key().unwrap().as_bytes()
        );
    }

    #[test]
    fn test_delete_key_erases_store_and_cache() {
        let (store, manager) = manager();
        let original = manager.ensure_key().unwrap();

        manager
            .delete_key(IrreversibleDeletion::acknowledge_all_documents_lost())
            .unwrap();
        assert!(!manager.is_cached());
        assert!(!manager.has_key().unwrap());
        assert!(store.is_empty());

        let replacement = manager.ensure_key().unwrap();
        assert_ne!(original.as_bytes(), replacement.as_bytes());
    }

    #[test]
    fn test_concurrent_callers_observe_same_key() {
        let (store, manager) = manager();
        let keys: Vec<[u8; MASTER_KEY_LEN]> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| *manager.ensure_key().unwrap().as_bytes()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(keys.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_corrupt_stored_key_is_key_storage_error() {
        let (store, manager) = manager();
        store.set(MASTER_KEY_ENTRY, "not base64 at all!").unwrap();
        assert!(matches!(manager.ensure_key(), Err(VaultError::KeyStorage(_))));

        store.set(MASTER_KEY_ENTRY, &STANDARD.encode([7u8; 16])).unwrap();
        assert!(matches!(manager.ensure_key(), Err(VaultError::KeyStorage(_))));
        // The bad entry must not be silently replaced
        assert_eq!(
            store.get(MASTER_KEY_ENTRY).unwrap().unwrap(),
            STANDARD.encode([7u8; 16])
        );
    }

    #[test]
    fn test_unavailable_store_propagates() {
        let (store, manager) = manager();
        store.set_unavailable(true);
        assert!(matches!(manager.ensure_key(), Err(VaultError::KeyStorage(_))));
        assert!(matches!(manager.has_key(), Err(VaultError::KeyStorage(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let (_store, manager) = manager();
        let key = manager.ensure_key().unwrap();
        assert!(format!("{:?}", key).contains("REDACTED"));
    }
}
