//! PIN credential store.
//!
//! The PIN itself is never stored. What goes into the secret store is an
//! Argon2id hash of it under the per-installation salt, together with the
//! cost parameters that produced the hash.

use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{debug, info};
use zeroize::Zeroizing;

use lockbox_secret::SecretStore;

use super::error::{VaultError, VaultResult};
use super::salt::{delete_salt, get_or_create_salt, load_salt};
use crate::storage::PinHashParams;

/// Secret store entry holding the serialized [`PinCredential`].
pub const PIN_HASH_ENTRY: &str = "lockbox_pin_hash";

pub const PIN_MIN_LEN: usize = 4;
pub const PIN_MAX_LEN: usize = 6;

const HASH_LEN: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct PinCredential {
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
    hash: String,
}

impl PinCredential {
    fn params(&self) -> PinHashParams {
        PinHashParams {
            memory_kib: self.memory_kib,
            iterations: self.iterations,
            parallelism: self.parallelism,
        }
    }
}

/// Check that a PIN is 4-6 ASCII digits.
pub fn validate_pin_format(pin: &str) -> VaultResult<()> {
    if pin.len() < PIN_MIN_LEN || pin.len() > PIN_MAX_LEN {
        return Err(VaultError::InvalidPinFormat(format!(
            "PIN must be {}-{} digits",
            PIN_MIN_LEN, PIN_MAX_LEN
        )));
    }
    if !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(VaultError::InvalidPinFormat(
            "PIN must contain digits only".into(),
        ));
    }
    Ok(())
}

/// Hash a PIN with Argon2id.
fn hash_pin(
    pin: &str,
    salt: &[u8],
    params: PinHashParams,
) -> VaultResult<Zeroizing<[u8; HASH_LEN]>> {
    let argon_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(HASH_LEN),
    )
    .map_err(|e| VaultError::KeyDerivation(format!("Invalid Argon2 params: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut hash = Zeroizing::new([0u8; HASH_LEN]);
    argon2
        .hash_password_into(pin.as_bytes(), salt, &mut hash[..])
        .map_err(|e| VaultError::KeyDerivation(format!("Argon2id hash failed: {}", e)))?;
    Ok(hash)
}

pub struct PinStore {
    store: Arc<dyn SecretStore>,
    params: PinHashParams,
}

impl PinStore {
    pub fn new(store: Arc<dyn SecretStore>, params: PinHashParams) -> Self {
        Self { store, params }
    }

    pub fn has_pin(&self) -> VaultResult<bool> {
        Ok(self.store.get(PIN_HASH_ENTRY)?.is_some())
    }

    /// Create or overwrite the stored credential.
    pub fn create(&self, pin: &str) -> VaultResult<()> {
        validate_pin_format(pin)?;

        let salt = get_or_create_salt(self.store.as_ref())?;
        let hash = hash_pin(pin, &salt, self.params)?;
        let credential = PinCredential {
            memory_kib: self.params.memory_kib,
            iterations: self.params.iterations,
            parallelism: self.params.parallelism,
            hash: STANDARD.encode(&hash[..]),
        };
        let encoded = serde_json::to_string(&credential)
            .map_err(|e| VaultError::KeyStorage(format!("cannot encode PIN credential: {}", e)))?;
        self.store.set(PIN_HASH_ENTRY, &encoded)?;

        info!("PIN credential stored");
        Ok(())
    }

    /// Compare `pin` against the stored credential.
    ///
    /// A mismatch is `Ok(false)`; only a missing or unreadable credential is
    /// an error.
    pub fn verify(&self, pin: &str) -> VaultResult<bool> {
        let credential = self.load()?;

        if validate_pin_format(pin).is_err() {
            debug!("Rejecting malformed PIN without hashing");
            return Ok(false);
        }

        let expected = Zeroizing::new(STANDARD.decode(&credential.hash).map_err(|e| {
            VaultError::KeyStorage(format!("stored PIN hash is not valid base64: {}", e))
        })?);
        let salt = load_salt(self.store.as_ref())?;
        let actual = hash_pin(pin, &salt, credential.params())?;

        Ok(bool::from(actual[..].ct_eq(&expected[..])))
    }

    /// Replace the PIN after checking the current one.
    pub fn change(&self, old_pin: &str, new_pin: &str) -> VaultResult<()> {
        validate_pin_format(new_pin)?;
        if !self.verify(old_pin)? {
            return Err(VaultError::PinMismatch);
        }
        self.create(new_pin)
    }

    /// Remove the credential and its salt.
    pub fn reset(&self) -> VaultResult<()> {
        self.store.delete(PIN_HASH_ENTRY)?;
        delete_salt(self.store.as_ref())?;
        info!("PIN credential removed");
        Ok(())
    }

    fn load(&self) -> VaultResult<PinCredential> {
        let encoded = self.store.get(PIN_HASH_ENTRY)?.ok_or(VaultError::NotSetUp)?;
        serde_json::from_str(&encoded)
            .map_err(|e| VaultError::KeyStorage(format!("stored PIN credential is corrupt: {}", e)))
    }
}


#[cfg(test)]
mod tests {
    use super::test_params::FAST;
    use super::*;
    use lockbox_secret::MemoryStore;

    fn pin_store() -> (Arc<MemoryStore>, PinStore) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), PinStore::new(store, FAST))
    }

    #[test]
    fn test_pin_format_validation() {
        assert!(validate_pin_format("1234").is_ok());
        assert!(validate_pin_format("123456").is_ok());
        for bad in ["", "123", "1234567", "12a4", "12 34", "١٢٣٤"] {
            assert!(
                matches!(validate_pin_format(bad), Err(VaultError::InvalidPinFormat(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_create_then_verify() {
        let (_store, pins) = pin_store();
        assert!(!pins.has_pin().unwrap());

        pins.create("1234").unwrap();
        assert!(pins.has_pin().unwrap());
        assert!(pins.verify("1234").unwrap());
        assert!(!pins.verify("0000").unwrap());
        assert!(!pins.verify("12345").unwrap());
        assert!(!pins.verify("abcd").unwrap());
    }

    #[test]
    fn test_verify_without_pin_is_not_set_up() {
        let (_store, pins) = pin_store();
        assert!(matches!(pins.verify("1234"), Err(VaultError::NotSetUp)));
    }

    #[test]
    fn test_create_rejects_bad_format_and_stores_nothing() {
        let (store, pins) = pin_store();
        assert!(matches!(
            pins.create("12"),
            Err(VaultError::InvalidPinFormat(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_stored_credential_is_not_the_pin() {
        let (store, pins) = pin_store();
        pins.create("246810").unwrap();
        let stored = store.get(PIN_HASH_ENTRY).unwrap().unwrap();
        assert!(!stored.contains("246810"));
    }

    #[test]
    fn test_change_requires_old_pin() {
        let (_store, pins) = pin_store();
        pins.create("1234").unwrap();

        assert!(matches!(
            pins.change("9999", "5678"),
            Err(VaultError::PinMismatch)
        ));
        assert!(pins.verify("1234").unwrap());

        pins.change("1234", "5678").unwrap();
        assert!(!pins.verify("1234").unwrap());
        assert!(pins.verify("5678").unwrap());
    }

    #[test]
    fn test_change_validates_new_pin_first() {
        let (_store, pins) = pin_store();
        pins.create("1234").unwrap();
        assert!(matches!(
            pins.change("1234", "12"),
            Err(VaultError::InvalidPinFormat(_))
        ));
        assert!(pins.verify("1234").unwrap());
    }

    #[test]
    fn test_credential_keeps_its_own_params() {
        let store = Arc::new(MemoryStore::new());
        PinStore::new(store.clone(), FAST).create("4321").unwrap();

        let stronger = PinHashParams {
            memory_kib: 16,
            iterations: 2,
            parallelism: 1,
        };
        let pins = PinStore::new(store, stronger);
        assert!(pins.verify("4321").unwrap());
    }

    #[test]
    fn test_reset_removes_credential_and_salt() {
        let (store, pins) = pin_store();
        pins.create("1234").unwrap();
        pins.reset().unwrap();
        assert!(!pins.has_pin().unwrap());
        assert!(store.is_empty());
    }
}
