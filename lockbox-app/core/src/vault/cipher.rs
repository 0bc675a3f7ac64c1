//! Per-file AES-256-GCM encryption under the vault master key.

use std::sync::Arc;

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore as _;
use tracing::debug;

use super::error::{VaultError, VaultResult};
use super::key::MasterKeyManager;

/// AES-GCM nonce length in bytes.
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_SIZE: usize = 16;

const BLOB_PREFIX: &str = "f_";
const BLOB_SUFFIX: &str = ".enc";
const BLOB_ID_LEN: usize = 16;

/// Output of [`FileCipher::encrypt`].
///
/// `nonce` is what the metadata catalog records next to the blob name;
/// `size` is the plaintext length.
#[derive(Debug, Clone)]
pub struct EncryptedPayload {
    pub ciphertext: Vec<u8>,
    pub nonce: String,
    pub size: usize,
}

/// AEAD over whole documents under the vault master key.
pub struct FileCipher {
    keys: Arc<MasterKeyManager>,
}

impl FileCipher {
    pub fn new(keys: Arc<MasterKeyManager>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &Arc<MasterKeyManager> {
        &self.keys
    }

    fn cipher(&self) -> VaultResult<Aes256Gcm> {
        let key = self.keys.ensure_key()?;
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|e| VaultError::Encryption(e.to_string()))
    }

    /// Encrypt under a fresh random nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> VaultResult<EncryptedPayload> {
        let cipher = self.cipher()?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| VaultError::Encryption(e.to_string()))?;

        debug!("Encrypted {} bytes", plaintext.len());
        Ok(EncryptedPayload {
            ciphertext,
            nonce: STANDARD.encode(nonce_bytes),
            size: plaintext.len(),
        })
    }

    /// Authenticate and decrypt.
    ///
    /// Any mismatch, whether key, nonce, truncation or a flipped bit, is
    /// [`VaultError::DecryptionFailure`] and yields no plaintext.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &str) -> VaultResult<Vec<u8>> {
        let nonce_bytes = STANDARD
            .decode(nonce.trim())
            .map_err(|_| VaultError::DecryptionFailure)?;
        if nonce_bytes.len() != NONCE_SIZE || ciphertext.len() < TAG_SIZE {
            return Err(VaultError::DecryptionFailure);
        }

        let cipher = self.cipher()?;
        cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext)
            .map_err(|_| VaultError::DecryptionFailure)
    }
}

/// Random opaque blob name: `f_<32 hex chars>.enc`.
pub fn generate_blob_filename() -> String {
    let mut id = [0u8; BLOB_ID_LEN];
    rand::rng().fill_bytes(&mut id);
    format!("{}{}{}", BLOB_PREFIX, hex::encode(id), BLOB_SUFFIX)
}

/// Whether `name` has the shape [`generate_blob_filename`] produces.
pub fn is_blob_filename(name: &str) -> bool {
    name.strip_prefix(BLOB_PREFIX)
        .and_then(|rest| rest.strip_suffix(BLOB_SUFFIX))
        .is_some_and(|id| {
            id.len() == BLOB_ID_LEN * 2
                && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        })
}
