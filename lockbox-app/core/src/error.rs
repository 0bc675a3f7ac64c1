use thiserror::Error;

use crate::vault::VaultError;

#[derive(Error, Debug)]
pub enum LockboxError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LockboxError {
    /// The underlying vault error, if this is one.
    pub fn as_vault(&self) -> Option<&VaultError> {
        match self {
            LockboxError::Vault(e) => Some(e),
            _ => None,
        }
    }
}

impl serde::Serialize for LockboxError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            LockboxError::Vault(e) => e.serialize(serializer),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LockboxError>;
