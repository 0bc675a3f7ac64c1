//! Lock state and authentication types.

use serde::{Deserialize, Serialize};

/// Represents the current lock state of the vault.
///
/// The vault transitions between these states:
/// - `FirstLaunch` → `Unlocked` (after the first PIN is created)
/// - `Unlocked` → `Locked` (explicit lock or auto-lock timeout)
/// - `Locked` → `Unlocked` (after successful PIN or biometric auth)
///
/// The process starts in `Locked` until first-run detection says otherwise.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum LockState {
    /// No PIN has been created yet
    FirstLaunch,
    /// A PIN exists and the user has not authenticated
    #[default]
    Locked,
    /// Documents may be imported and viewed
    Unlocked,
}

/// How the user got from `Locked` to `Unlocked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Pin,
    Biometric,
}

/// Snapshot of the persisted authentication settings.
///
/// Deliberately carries only whether a PIN exists, never its hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    pub pin_set: bool,
    pub biometric_enabled: bool,
    /// Minutes of inactivity before auto-lock; 0 disables it.
    pub auto_lock_minutes: u32,
}

impl std::fmt::Display for LockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstLaunch => write!(f, "FirstLaunch"),
            Self::Locked => write!(f, "Locked"),
            Self::Unlocked => write!(f, "Unlocked"),
        }
    }
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pin => write!(f, "pin"),
            Self::Biometric => write!(f, "biometric"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_locked() {
        assert_eq!(LockState::default(), LockState::Locked);
    }

    #[test]
    fn test_lock_state_wire_names() {
        assert_eq!(
            serde_json::to_string(&LockState::FirstLaunch).unwrap(),
            "\"FirstLaunch\""
        );
        assert_eq!(AuthMethod::Biometric.to_string(), "biometric");
    }
}
