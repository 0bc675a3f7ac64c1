//! Biometric delegation.
//!
//! The platform owns the prompt, the sensor and the enrollment database.
//! Lockbox only consumes the outcome.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BiometricKind, BiometricOutcome};

#[async_trait]
pub trait BiometricProvider: Send + Sync {
    /// Whether the device has a biometric sensor at all.
    async fn has_hardware(&self) -> bool;

    /// Whether at least one biometric is enrolled.
    async fn is_enrolled(&self) -> bool;

    /// Modalities the device supports, most specific first.
    async fn supported_kinds(&self) -> Vec<BiometricKind>;

    /// Show the platform prompt and report how it ended.
    ///
    /// A sensor rejection may be reported either as
    /// [`BiometricOutcome::Failure`] or as [`crate::Error::AuthenticationFailed`].
    async fn authenticate(&self, prompt: &str) -> Result<BiometricOutcome>;
}

/// User-facing label for the strongest available modality.
pub fn biometric_label(kinds: &[BiometricKind]) -> &'static str {
    if kinds.contains(&BiometricKind::Fingerprint) {
        "Fingerprint"
    } else if kinds.contains(&BiometricKind::FacialRecognition) {
        "Face ID"
    } else if kinds.contains(&BiometricKind::Iris) {
        "Iris"
    } else {
        "Biometrics"
    }
}

/// Provider for hosts without biometric hardware.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBiometrics;

#[async_trait]
impl BiometricProvider for NoBiometrics {
    async fn has_hardware(&self) -> bool {
        false
    }

    async fn is_enrolled(&self) -> bool {
        false
    }

    async fn supported_kinds(&self) -> Vec<BiometricKind> {
        Vec::new()
    }

    async fn authenticate(&self, _prompt: &str) -> Result<BiometricOutcome> {
        Ok(BiometricOutcome::Failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_prefers_fingerprint() {
        let kinds = [BiometricKind::FacialRecognition, BiometricKind::Fingerprint];
        assert_eq!(biometric_label(&kinds), "Fingerprint");
    }

    #[test]
    fn test_label_falls_back_to_generic() {
        assert_eq!(biometric_label(&[]), "Biometrics");
        assert_eq!(biometric_label(&[BiometricKind::Iris]), "Iris");
    }

    #[tokio::test]
    async fn test_no_biometrics_never_succeeds() {
        let provider = NoBiometrics;
        assert!(!provider.has_hardware().await);
        assert!(!provider.is_enrolled().await);
        assert_eq!(
            provider.authenticate("Unlock").await.unwrap(),
            BiometricOutcome::Failure
        );
    }
}
