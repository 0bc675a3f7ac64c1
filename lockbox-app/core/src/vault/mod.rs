//! Security core of the document vault.
//!
//! This module provides:
//! - The master key lifecycle (secret store + in-memory cache)
//! - The Argon2id PIN credential and auth settings
//! - The lock state machine and its inactivity timer
//! - AES-256-GCM encryption of document blobs
//!
//! Nothing here touches a document until [`LockService::ensure_unlocked`]
//! says so; the gating itself is done by the [`crate::Lockbox`] facade.

pub mod auth;
pub mod auth_persistence;
pub mod auto_lock;
pub mod cipher;
pub mod error;
pub mod key;
pub mod lock;
pub mod pin;
pub mod salt;

pub use auth::{AuthConfig, AuthMethod, LockState};
pub use auth_persistence::{AuthSettings, DEFAULT_AUTO_LOCK_MINUTES};
pub use auto_lock::{ActivityClock, AutoLockScheduler};
pub use cipher::{EncryptedPayload, FileCipher};
pub use error::{VaultError, VaultResult};
pub use key::{IrreversibleDeletion, MasterKey, MasterKeyManager};
pub use lock::{LockListener, LockService, Subscription};
pub use pin::{validate_pin_format, PinStore};
pub use salt::{delete_salt, get_or_create_salt};
