mod config;
mod paths;

pub use config::{
    load_config, save_config, KeyCachePolicy, LockboxConfig, LockoutPolicy, PinHashParams,
    MAX_AUTO_LOCK_POLL_SECS, MAX_LOCKOUT_COOLDOWN_SECS,
};
pub use paths::{cache_dir, data_dir, default_scratch_dir, default_vault_dir};
