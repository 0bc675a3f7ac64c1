//! Salt manager for Argon2 PIN hashing.
//!
//! Each installation generates a unique 16-byte salt that is fed to Argon2id
//! together with the user's PIN. The salt lives in the secret store next to
//! the PIN credential so both disappear together on reset.

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;

use lockbox_secret::SecretStore;

use super::error::{VaultError, VaultResult};

/// Salt size in bytes (128 bits)
pub const SALT_SIZE: usize = 16;

/// Secret store entry holding the base64-encoded salt.
pub const SALT_ENTRY: &str = "lockbox_pin_salt";

/// Get the existing salt or create a new one.
///
/// Using a unique salt per installation ensures that identical PINs produce
/// different hashes on different devices.
pub fn get_or_create_salt(store: &dyn SecretStore) -> VaultResult<[u8; SALT_SIZE]> {
    if let Some(encoded) = store.get(SALT_ENTRY)? {
        return decode_salt(&encoded);
    }

    let mut salt = [0u8; SALT_SIZE];
    rand::rng().fill_bytes(&mut salt);
    store.set(SALT_ENTRY, &STANDARD.encode(salt))?;
    Ok(salt)
}

/// Load the salt, failing if none has been created yet.
pub fn load_salt(store: &dyn SecretStore) -> VaultResult<[u8; SALT_SIZE]> {
    match store.get(SALT_ENTRY)? {
        Some(encoded) => decode_salt(&encoded),
        None => Err(VaultError::KeyStorage("PIN salt is missing".into())),
    }
}

/// Delete the salt.
///
/// Called on auth reset so the next PIN is hashed under a fresh salt.
/// Succeeds when there is nothing to delete.
pub fn delete_salt(store: &dyn SecretStore) -> VaultResult<()> {
    store.delete(SALT_ENTRY)?;
    Ok(())
}

fn decode_salt(encoded: &str) -> VaultResult<[u8; SALT_SIZE]> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| VaultError::KeyStorage(format!("stored salt is not valid base64: {}", e)))?;
    if bytes.len() != SALT_SIZE {
        return Err(VaultError::KeyStorage(format!(
            "Invalid salt size: expected {} bytes, got {}",
            SALT_SIZE,
            bytes.len()
        )));
    }
    let mut salt = [0u8; SALT_SIZE];
    salt.copy_from_slice(&bytes);
    Ok(salt)
}
