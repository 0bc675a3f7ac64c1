use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use lockbox_secret::{BiometricProvider, SecretStore};

use crate::error::Result;
use crate::files::{ScratchFile, StoredBlob, VaultFiles};
use crate::storage::LockboxConfig;
use crate::vault::{
    FileCipher, IrreversibleDeletion, LockService, LockState, MasterKeyManager,
};

/// One open vault: the master key, the lock state machine and the files on
/// disk, wired together.
///
/// Every document operation checks that the vault is unlocked and counts as
/// user activity for the auto-lock timer.
pub struct Lockbox {
    config: LockboxConfig,
    keys: Arc<MasterKeyManager>,
    lock: LockService,
    files: VaultFiles,
}

impl Lockbox {
    /// Validate the config, prepare the directories (sweeping scratch) and
    /// detect whether this is a first launch.
    pub async fn open(
        config: LockboxConfig,
        store: Arc<dyn SecretStore>,
        biometrics: Arc<dyn BiometricProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let status = store.check_availability();
        if !status.available {
            warn!(
                "Secret store unavailable: {}",
                status.unavailable_reason.as_deref().unwrap_or("unknown reason")
            );
        }

        let keys = Arc::new(MasterKeyManager::new(store.clone()));
        let lock = LockService::new(store, keys.clone(), biometrics, &config)?;
        let files = VaultFiles::new(
            config.vault_dir.clone(),
            config.scratch_dir.clone(),
            FileCipher::new(keys.clone()),
        );
        files.init().await?;

        info!("Lockbox opened in {} state", lock.state());
        Ok(Self {
            config,
            keys,
            lock,
            files,
        })
    }

    /// Open with the OS keyring and no biometric provider.
    #[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux"))]
    pub async fn open_default(config: LockboxConfig) -> Result<Self> {
        let store = Arc::new(lockbox_secret::KeyringStore::new(
            config.keyring_service.clone(),
        ));
        Self::open(config, store, Arc::new(lockbox_secret::NoBiometrics)).await
    }

    pub fn config(&self) -> &LockboxConfig {
        &self.config
    }

    /// PIN, biometric and auto-lock operations.
    pub fn lock_service(&self) -> &LockService {
        &self.lock
    }

    pub fn keys(&self) -> &Arc<MasterKeyManager> {
        &self.keys
    }

    pub fn files(&self) -> &VaultFiles {
        &self.files
    }

    pub fn state(&self) -> LockState {
        self.lock.state()
    }

    pub async fn import_bytes(&self, plaintext: &[u8]) -> Result<StoredBlob> {
        self.gate()?;
        Ok(self.files.encrypt_and_save(plaintext).await?)
    }

    pub async fn import_file(&self, source: &Path) -> Result<StoredBlob> {
        self.gate()?;
        Ok(self.files.import_file(source).await?)
    }

    /// Decrypt a document into scratch for display.
    pub async fn view(&self, filename: &str, nonce: &str, mime: &str) -> Result<ScratchFile> {
        self.gate()?;
        Ok(self.files.decrypt_to_scratch(filename, nonce, mime).await?)
    }

    /// Remove a scratch copy. Allowed in any state.
    pub async fn release_view(&self, scratch: &ScratchFile) {
        self.files.delete_scratch(&scratch.path).await;
    }

    pub async fn delete_document_blob(&self, filename: &str) -> Result<()> {
        self.gate()?;
        Ok(self.files.delete_blob(filename).await?)
    }

    /// Destroy the master key. Every stored document becomes unreadable.
    pub fn delete_master_key(&self, ack: IrreversibleDeletion) -> Result<()> {
        self.gate()?;
        Ok(self.keys.delete_key(ack)?)
    }

    fn gate(&self) -> Result<()> {
        self.lock.ensure_unlocked()?;
        self.lock.record_activity();
        Ok(())
    }
}
