//! Vault configuration, stored as JSON.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use super::paths::{default_scratch_dir, default_vault_dir};
use crate::error::{LockboxError, Result};

/// Longest accepted auto-lock poll interval.
pub const MAX_AUTO_LOCK_POLL_SECS: u64 = 60 * 60;

/// Longest accepted lockout cooldown.
pub const MAX_LOCKOUT_COOLDOWN_SECS: u64 = 24 * 60 * 60;

/// Whether the cached master key survives a transition into `Locked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCachePolicy {
    /// Evict (and zeroize) the cached key on every lock.
    #[default]
    ClearOnLock,
    /// Keep the key in memory while locked for a faster next unlock.
    RetainWhileLocked,
}

/// Argon2id cost parameters for the PIN credential.
///
/// Defaults:
/// - Memory: 64 MB (provides strong resistance to GPU attacks)
/// - Time: 3 iterations (reasonable delay on modern hardware)
/// - Parallelism: 4 lanes (utilizes multi-core CPUs)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinHashParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PinHashParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Cooldown applied after repeated PIN failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutPolicy {
    /// Consecutive failures that trigger the cooldown.
    pub max_attempts: u32,
    pub cooldown_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockboxConfig {
    pub vault_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub keyring_service: String,
    pub auto_lock_poll_secs: u64,
    pub key_cache_policy: KeyCachePolicy,
    pub pin_hash: PinHashParams,
    pub lockout: Option<LockoutPolicy>,
}

impl Default for LockboxConfig {
    fn default() -> Self {
        Self {
            vault_dir: default_vault_dir(),
            scratch_dir: default_scratch_dir(),
            keyring_service: "com.lockbox.vault".to_string(),
            auto_lock_poll_secs: 10,
            key_cache_policy: KeyCachePolicy::default(),
            pin_hash: PinHashParams::default(),
            lockout: None,
        }
    }
}

impl LockboxConfig {
    /// Poll interval, clamped to `1..=MAX_AUTO_LOCK_POLL_SECS` seconds.
    pub fn auto_lock_poll_interval(&self) -> Duration {
        Duration::from_secs(self.auto_lock_poll_secs.clamp(1, MAX_AUTO_LOCK_POLL_SECS))
    }

    pub fn validate(&self) -> Result<()> {
        if self.auto_lock_poll_secs == 0 || self.auto_lock_poll_secs > MAX_AUTO_LOCK_POLL_SECS {
            return Err(LockboxError::Config(format!(
                "auto_lock_poll_secs must be between 1 and {}",
                MAX_AUTO_LOCK_POLL_SECS
            )));
        }

        // Scratch is wiped on startup, so neither directory may contain the other
        let vault = normalize(&self.vault_dir);
        let scratch = normalize(&self.scratch_dir);
        if vault.starts_with(&scratch) || scratch.starts_with(&vault) {
            return Err(LockboxError::Config(format!(
                "vault_dir {:?} and scratch_dir {:?} must not overlap",
                self.vault_dir, self.scratch_dir
            )));
        }

        let p = &self.pin_hash;
        if p.parallelism == 0 || p.iterations == 0 || p.memory_kib < 8 * p.parallelism {
            return Err(LockboxError::Config(format!(
                "invalid Argon2 parameters: m={} t={} p={}",
                p.memory_kib, p.iterations, p.parallelism
            )));
        }
        if let Some(lockout) = &self.lockout {
            if lockout.max_attempts == 0 {
                return Err(LockboxError::Config(
                    "lockout.max_attempts must be at least 1".into(),
                ));
            }
            if lockout.cooldown_secs > MAX_LOCKOUT_COOLDOWN_SECS {
                return Err(LockboxError::Config(format!(
                    "lockout.cooldown_secs must be at most {}",
                    MAX_LOCKOUT_COOLDOWN_SECS
                )));
            }
        }
        Ok(())
    }
}

/// Lexically resolve `.` and `..` so overlap checks see through them.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Load config from a JSON file, falling back to defaults when absent.
pub fn load_config(path: &Path) -> Result<LockboxConfig> {
    if !path.exists() {
        return Ok(LockboxConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: LockboxConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

pub fn save_config(path: &Path, config: &LockboxConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
