pub mod error;
pub mod files;
pub mod state;
pub mod storage;
pub mod vault;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{LockboxError, Result};
pub use files::{format_file_size, DocumentKind, FileType, ScratchFile, StoredBlob, VaultFiles};
pub use lockbox_secret::{BiometricProvider, MemoryStore, NoBiometrics, SecretStore};
pub use state::Lockbox;
pub use storage::{load_config, save_config, KeyCachePolicy, LockboxConfig, LockoutPolicy};
pub use vault::{
    AuthConfig, AuthMethod, IrreversibleDeletion, LockService, LockState, Subscription,
    VaultError, VaultResult,
};

/// Log filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "lockbox_lib=debug,lockbox_secret=info";

/// Install the global tracing subscriber.
///
/// Does nothing if a subscriber is already installed.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
