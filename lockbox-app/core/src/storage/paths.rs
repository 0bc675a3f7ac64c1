use directories::ProjectDirs;
use std::path::PathBuf;

use crate::error::{LockboxError, Result};

pub const APP_QUALIFIER: &str = "com";
pub const APP_ORG: &str = "lockbox";
pub const APP_NAME: &str = "Lockbox";

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or_else(|| LockboxError::Config("cannot determine home directory".into()))
}

/// Durable per-user data directory.
pub fn data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

/// Volatile per-user cache directory.
pub fn cache_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.cache_dir().to_path_buf())
}

/// Where encrypted blobs live.
pub fn default_vault_dir() -> PathBuf {
    data_dir()
        .unwrap_or_else(|_| PathBuf::from("lockbox-data"))
        .join("encrypted")
}

/// Where decrypted temporaries live. Swept on every startup.
pub fn default_scratch_dir() -> PathBuf {
    cache_dir()
        .unwrap_or_else(|_| std::env::temp_dir().join("lockbox"))
        .join("temp")
}
