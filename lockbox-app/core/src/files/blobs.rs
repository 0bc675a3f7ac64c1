//! Encrypted blobs on disk and their decrypted scratch copies.
//!
//! Two directories: the durable vault directory holding `f_<hex>.enc`
//! ciphertext files, and the volatile scratch directory holding plaintext
//! copies for viewing. Scratch is wiped every time [`VaultFiles::init`] runs.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::mime::{DocumentKind, FileType};
use crate::vault::cipher::{generate_blob_filename, is_blob_filename, FileCipher};
use crate::vault::{VaultError, VaultResult};

const SCRATCH_PREFIX: &str = "temp_";

/// What the metadata catalog needs to find and decrypt a blob again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBlob {
    pub filename: String,
    pub nonce: String,
    /// Plaintext length in bytes.
    pub size: usize,
    pub created_at: DateTime<Utc>,
}

/// A decrypted plaintext copy. Delete it with [`VaultFiles::delete_scratch`]
/// once it has been shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchFile {
    pub path: PathBuf,
    pub kind: DocumentKind,
}

pub struct VaultFiles {
    vault_dir: PathBuf,
    scratch_dir: PathBuf,
    cipher: FileCipher,
}

impl VaultFiles {
    pub fn new(vault_dir: PathBuf, scratch_dir: PathBuf, cipher: FileCipher) -> Self {
        Self {
            vault_dir,
            scratch_dir,
            cipher,
        }
    }

    pub fn vault_dir(&self) -> &Path {
        &self.vault_dir
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn cipher(&self) -> &FileCipher {
        &self.cipher
    }

    /// Create both directories and sweep leftover scratch files.
    pub async fn init(&self) -> VaultResult<()> {
        tokio::fs::create_dir_all(&self.vault_dir)
            .await
            .map_err(|e| VaultError::file_io(&self.vault_dir, e))?;
        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| VaultError::file_io(&self.scratch_dir, e))?;
        self.clean_scratch().await;

        info!("Vault directory ready at {:?}", self.vault_dir);
        Ok(())
    }

    /// Read a file from outside the vault and store it encrypted.
    pub async fn import_file(&self, source: &Path) -> VaultResult<StoredBlob> {
        let plaintext = tokio::fs::read(source)
            .await
            .map_err(|e| VaultError::file_io(source, e))?;
        self.encrypt_and_save(&plaintext).await
    }

    /// Encrypt `plaintext` and write it under a fresh random blob name.
    pub async fn encrypt_and_save(&self, plaintext: &[u8]) -> VaultResult<StoredBlob> {
        let payload = self.cipher.encrypt(plaintext)?;
        let filename = generate_blob_filename();
        let path = self.vault_dir.join(&filename);

        if let Err(e) = write_private(&path, &payload.ciphertext).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(VaultError::file_io(&path, e));
        }

        info!("Stored encrypted blob {}", filename);
        Ok(StoredBlob {
            filename,
            nonce: payload.nonce,
            size: payload.size,
            created_at: Utc::now(),
        })
    }

    /// Read and decrypt a blob into memory.
    pub async fn decrypt_blob(&self, filename: &str, nonce: &str) -> VaultResult<Vec<u8>> {
        let path = self.blob_path(filename)?;
        let ciphertext = tokio::fs::read(&path)
            .await
            .map_err(|e| VaultError::file_io(&path, e))?;
        self.cipher.decrypt(&ciphertext, nonce)
    }

    /// Decrypt a blob into a new scratch file named after its MIME type.
    pub async fn decrypt_to_scratch(
        &self,
        filename: &str,
        nonce: &str,
        mime: &str,
    ) -> VaultResult<ScratchFile> {
        let plaintext = self.decrypt_blob(filename, nonce).await?;
        let file_type = FileType::from_mime(mime);
        let path = self
            .scratch_dir
            .join(format!("{}{}{}", SCRATCH_PREFIX, Uuid::new_v4(), file_type.extension));

        if let Err(e) = write_private(&path, &plaintext).await {
            self.delete_scratch(&path).await;
            return Err(VaultError::file_io(&path, e));
        }

        debug!("Decrypted {} to scratch", filename);
        Ok(ScratchFile {
            path,
            kind: file_type.kind,
        })
    }

    /// Remove a blob. Succeeds when it is already gone.
    pub async fn delete_blob(&self, filename: &str) -> VaultResult<()> {
        let path = self.blob_path(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted encrypted blob {}", filename);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VaultError::file_io(&path, e)),
        }
    }

    /// Best-effort removal of a scratch file; failures are only logged.
    ///
    /// Only `temp_*` files directly inside the scratch directory are
    /// touched; anything else is left alone.
    pub async fn delete_scratch(&self, path: &Path) {
        if !self.is_scratch_file(path) {
            warn!("Refusing to delete {:?}: not a scratch file", path);
            return;
        }
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Deleted scratch file {:?}", path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to delete scratch file {:?}: {}", path, e),
        }
    }

    /// Wipe and recreate the scratch directory. Best-effort.
    pub async fn clean_scratch(&self) {
        match tokio::fs::remove_dir_all(&self.scratch_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to clear scratch directory: {}", e),
        }
        if let Err(e) = tokio::fs::create_dir_all(&self.scratch_dir).await {
            warn!("Failed to recreate scratch directory: {}", e);
            return;
        }
        debug!("Scratch directory cleaned");
    }

    pub async fn blob_exists(&self, filename: &str) -> VaultResult<bool> {
        let path = self.blob_path(filename)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| VaultError::file_io(&path, e))
    }

    /// On-disk (ciphertext) size, or `None` if the blob does not exist.
    pub async fn blob_size(&self, filename: &str) -> VaultResult<Option<u64>> {
        let path = self.blob_path(filename)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VaultError::file_io(&path, e)),
        }
    }

    /// Names of all blobs in the vault directory, sorted.
    pub async fn list_blobs(&self) -> VaultResult<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.vault_dir)
            .await
            .map_err(|e| VaultError::file_io(&self.vault_dir, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| VaultError::file_io(&self.vault_dir, e))?
        {
            if let Some(name) = entry.file_name().to_str() {
                if is_blob_filename(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn is_scratch_file(&self, path: &Path) -> bool {
        let in_scratch = path.parent() == Some(self.scratch_dir.as_path());
        let named_like_scratch = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(SCRATCH_PREFIX));
        in_scratch && named_like_scratch
    }

    fn blob_path(&self, filename: &str) -> VaultResult<PathBuf> {
        if !is_blob_filename(filename) {
            return Err(VaultError::InvalidBlobName(filename.to_string()));
        }
        Ok(self.vault_dir.join(filename))
    }
}

/// Create `path` (which must not exist) readable by the owner only.
async fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::key::{IrreversibleDeletion, MasterKeyManager};
    use lockbox_secret::MemoryStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn files() -> (TempDir, VaultFiles) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let cipher = FileCipher::new(Arc::new(MasterKeyManager::new(store)));
        let files = VaultFiles::new(
            dir.path().join("encrypted"),
            dir.path().join("temp"),
            cipher,
        );
        files.init().await.unwrap();
        (dir, files)
    }

    #[tokio::test]
    async fn test_save_then_view() {
        let (_dir, files) = files().await;
        let blob = files.encrypt_and_save(b"%PDF-1.7 lease").await.unwrap();

        assert!(is_blob_filename(&blob.filename));
        assert_eq!(blob.size, 14);
        let on_disk = tokio::fs::read(files.vault_dir().join(&blob.filename))
            .await
            .unwrap();
        assert_ne!(on_disk, b"%PDF-1.7 lease");

        let scratch = files
            .decrypt_to_scratch(&blob.filename, &blob.nonce, "application/pdf")
            .await
            .unwrap();
        assert!(scratch.path.starts_with(files.scratch_dir()));
        assert_eq!(scratch.kind, DocumentKind::Document);
        let name = scratch.path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("temp_") && name.ends_with(".pdf"));
        assert_eq!(
            tokio::fs::read(&scratch.path).await.unwrap(),
            b"%PDF-1.7 lease"
        );

        files.delete_scratch(&scratch.path).await;
        assert!(!scratch.path.exists());
        files.delete_scratch(&scratch.path).await;
    }

    #[tokio::test]
    async fn test_unknown_mime_gets_bin_extension() {
        let (_dir, files) = files().await;
        let blob = files.encrypt_and_save(&[0u8; 32]).await.unwrap();
        let scratch = files
            .decrypt_to_scratch(&blob.filename, &blob.nonce, "application/x-unknown")
            .await
            .unwrap();
        assert_eq!(scratch.path.extension().unwrap(), "bin");
        assert_eq!(scratch.kind, DocumentKind::Unknown);
    }

    #[tokio::test]
    async fn test_import_file() {
        let (dir, files) = files().await;
        let source = dir.path().join("notes.txt");
        tokio::fs::write(&source, b"call the notary").await.unwrap();

        let blob = files.import_file(&source).await.unwrap();
        assert_eq!(
            files.decrypt_blob(&blob.filename, &blob.nonce).await.unwrap(),
            b"call the notary"
        );

        let missing = files.import_file(&dir.path().join("missing.txt")).await;
        assert!(matches!(missing, Err(VaultError::FileIo { .. })));
    }

    #[tokio::test]
    async fn test_init_sweeps_scratch() {
        let (_dir, files) = files().await;
        let leftover = files.scratch_dir().join("temp_crashed.jpg");
        tokio::fs::write(&leftover, b"plaintext").await.unwrap();
        let blob = files.encrypt_and_save(b"keep me").await.unwrap();

        files.init().await.unwrap();
        assert!(!leftover.exists());
        assert!(files.scratch_dir().is_dir());
        assert!(files.blob_exists(&blob.filename).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_and_inspect_blobs() {
        let (_dir, files) = files().await;
        let a = files.encrypt_and_save(b"first").await.unwrap();
        let b = files.encrypt_and_save(b"second!").await.unwrap();
        tokio::fs::write(files.vault_dir().join("notes.txt"), b"stray")
            .await
            .unwrap();

        let mut expected = vec![a.filename.clone(), b.filename.clone()];
        expected.sort();
        assert_eq!(files.list_blobs().await.unwrap(), expected);
        assert_eq!(
            files.blob_size(&b.filename).await.unwrap(),
            Some(7 + crate::vault::cipher::TAG_SIZE as u64)
        );

        files.delete_blob(&a.filename).await.unwrap();
        files.delete_blob(&a.filename).await.unwrap();
        assert!(!files.blob_exists(&a.filename).await.unwrap());
        assert_eq!(files.blob_size(&a.filename).await.unwrap(), None);
        assert_eq!(files.list_blobs().await.unwrap(), vec![b.filename]);
    }

    #[tokio::test]
    async fn test_rejects_foreign_blob_names() {
        let (_dir, files) = files().await;
        for name in ["../escape.enc", "notes.txt", "/etc/passwd"] {
            assert!(matches!(
                files.delete_blob(name).await,
                Err(VaultError::InvalidBlobName(_))
            ));
            assert!(matches!(
                files.decrypt_blob(name, "AAAA").await,
                Err(VaultError::InvalidBlobName(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_delete_scratch_ignores_outside_paths() {
        let (dir, files) = files().await;
        let outside = dir.path().join("important.txt");
        tokio::fs::write(&outside, b"keep").await.unwrap();
        files.delete_scratch(&outside).await;
        assert!(outside.exists());

        let escaped = files.scratch_dir().join("..").join("important.txt");
        files.delete_scratch(&escaped).await;
        assert!(outside.exists());

        let escaped_temp = dir.path().join("temp_notes.txt");
        tokio::fs::write(&escaped_temp, b"keep").await.unwrap();
        files
            .delete_scratch(&files.scratch_dir().join("..").join("temp_notes.txt"))
            .await;
        assert!(escaped_temp.exists());
    }

    #[tokio::test]
    async fn test_delete_scratch_only_touches_scratch_files() {
        let (_dir, files) = files().await;
        let nested_dir = files.scratch_dir().join("nested");
        tokio::fs::create_dir_all(&nested_dir).await.unwrap();
        let nested = nested_dir.join("temp_x.txt");
        let foreign = files.scratch_dir().join("readme.txt");
        tokio::fs::write(&nested, b"x").await.unwrap();
        tokio::fs::write(&foreign, b"x").await.unwrap();

        files.delete_scratch(&nested).await;
        files.delete_scratch(&foreign).await;
        assert!(nested.exists());
        assert!(foreign.exists());
    }

    #[tokio::test]
    async fn test_missing_blob_is_file_io() {
        let (_dir, files) = files().await;
        let name = generate_blob_filename();
        assert!(matches!(
            files.decrypt_blob(&name, "AAAAAAAAAAAAAAAA").await,
            Err(VaultError::FileIo { .. })
        ));
    }

    #[tokio::test]
    async fn test_deleted_key_leaves_blob_undecryptable() {
        let (_dir, files) = files().await;
        let blob = files.encrypt_and_save(b"birth certificate").await.unwrap();
        files
            .cipher()
            .keys()
            .delete_key(IrreversibleDeletion::acknowledge_all_documents_lost())
            .unwrap();

        assert!(matches!(
            files
                .decrypt_to_scratch(&blob.filename, &blob.nonce, "image/png")
                .await,
            Err(VaultError::DecryptionFailure)
        ));
        let mut leftovers = tokio::fs::read_dir(files.scratch_dir()).await.unwrap();
        assert!(leftovers.next_entry().await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, files) = files().await;
        let blob = files.encrypt_and_save(b"secret").await.unwrap();
        let scratch = files
            .decrypt_to_scratch(&blob.filename, &blob.nonce, "text/plain")
            .await
            .unwrap();

        for path in [files.vault_dir().join(&blob.filename), scratch.path] {
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600, "{:?}", path);
        }
    }
}
