//! Lock state machine.
//!
//! `LockService` is the single owner of the vault's [`LockState`]. It drives
//! transitions from PIN and biometric authentication, explicit lock requests
//! and the auto-lock timer, and notifies subscribers after each change.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use lockbox_secret::{biometric_label, BiometricOutcome, BiometricProvider, SecretStore};

use super::auth::{AuthConfig, AuthMethod, LockState};
use super::auth_persistence::AuthSettings;
use super::auto_lock::{ActivityClock, AutoLockScheduler};
use super::error::{VaultError, VaultResult};
use super::key::MasterKeyManager;
use super::pin::PinStore;
use crate::storage::{KeyCachePolicy, LockboxConfig, LockoutPolicy, MAX_LOCKOUT_COOLDOWN_SECS};

/// Callback invoked with the new state after every transition.
pub type LockListener = Arc<dyn Fn(LockState) + Send + Sync>;

struct ListenerEntry {
    id: u64,
    listener: LockListener,
}

/// States waiting to be delivered to listeners.
///
/// Transitions triggered from inside a listener are queued behind the one
/// being delivered, so every listener sees states in transition order.
#[derive(Default)]
struct Outbox {
    queue: VecDeque<LockState>,
    delivering: bool,
}

#[derive(Default)]
struct FailedAttempts {
    count: u32,
    locked_until: Option<Instant>,
}

struct LockInner {
    state: Mutex<LockState>,
    listeners: Mutex<Vec<ListenerEntry>>,
    next_listener_id: AtomicU64,
    outbox: Mutex<Outbox>,
    pins: Arc<PinStore>,
    settings: AuthSettings,
    keys: Arc<MasterKeyManager>,
    biometrics: Arc<dyn BiometricProvider>,
    scheduler: AutoLockScheduler,
    key_cache_policy: KeyCachePolicy,
    lockout: Option<LockoutPolicy>,
    failures: Mutex<FailedAttempts>,
}

/// Handle returned by [`LockService::subscribe`].
///
/// Dropping it does not unsubscribe.
#[must_use]
pub struct Subscription {
    id: u64,
    inner: Weak<LockInner>,
}

impl Subscription {
    /// Stop receiving notifications. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners.lock().retain(|entry| entry.id != self.id);
        }
    }
}

/// Cheap to clone; clones share state.
///
/// Unlocking spawns the auto-lock task, so transitions must run inside a
/// tokio runtime.
#[derive(Clone)]
pub struct LockService {
    inner: Arc<LockInner>,
}

impl LockService {
    /// Build the service and detect first launch.
    ///
    /// Starts in `Locked`, or `FirstLaunch` when no PIN credential exists.
    pub fn new(
        store: Arc<dyn SecretStore>,
        keys: Arc<MasterKeyManager>,
        biometrics: Arc<dyn BiometricProvider>,
        config: &LockboxConfig,
    ) -> VaultResult<Self> {
        let pins = Arc::new(PinStore::new(store.clone(), config.pin_hash));
        let initial = if pins.has_pin()? {
            LockState::Locked
        } else {
            LockState::FirstLaunch
        };
        info!("Lock service starting in {} state", initial);

        Ok(Self {
            inner: Arc::new(LockInner {
                state: Mutex::new(initial),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(1),
                outbox: Mutex::new(Outbox::default()),
                pins,
                settings: AuthSettings::new(store),
                keys,
                biometrics,
                scheduler: AutoLockScheduler::new(
                    config.auto_lock_poll_interval(),
                    ActivityClock::new(),
                ),
                key_cache_policy: config.key_cache_policy,
                lockout: config.lockout,
                failures: Mutex::new(FailedAttempts::default()),
            }),
        })
    }

    pub fn state(&self) -> LockState {
        *self.inner.state.lock()
    }

    /// Register a listener. Listeners run in subscription order, on the
    /// thread that caused the transition.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(LockState) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().push(ListenerEntry {
            id,
            listener: Arc::new(listener),
        });
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn has_pin(&self) -> VaultResult<bool> {
        self.inner.pins.has_pin()
    }

    /// Create the first PIN and unlock.
    pub async fn create_pin(&self, pin: &str) -> VaultResult<()> {
        if self.state() != LockState::FirstLaunch {
            return Err(VaultError::AlreadySetUp);
        }

        let pin = Zeroizing::new(pin.to_owned());
        self.with_pins(move |pins| pins.create(&pin)).await?;

        self.reset_failures();
        let minutes = self.inner.settings.auto_lock_minutes()?;
        self.enter_unlocked(AuthMethod::Pin, minutes);
        Ok(())
    }

    /// Check a PIN and unlock on match.
    ///
    /// A wrong PIN is `Ok(false)` and leaves the state alone. While already
    /// unlocked a correct PIN only counts as activity.
    pub async fn verify_pin(&self, pin: &str) -> VaultResult<bool> {
        if self.state() == LockState::FirstLaunch {
            return Err(VaultError::NotSetUp);
        }
        self.check_lockout()?;

        let pin = Zeroizing::new(pin.to_owned());
        if !self.with_pins(move |pins| pins.verify(&pin)).await? {
            self.record_failure();
            return Ok(false);
        }

        self.reset_failures();
        let minutes = self.inner.settings.auto_lock_minutes()?;
        self.enter_unlocked(AuthMethod::Pin, minutes);
        Ok(true)
    }

    /// Replace the PIN. Does not change the lock state.
    pub async fn change_pin(&self, old_pin: &str, new_pin: &str) -> VaultResult<()> {
        if self.state() == LockState::FirstLaunch {
            return Err(VaultError::NotSetUp);
        }
        self.check_lockout()?;

        let old_pin = Zeroizing::new(old_pin.to_owned());
        let new_pin = Zeroizing::new(new_pin.to_owned());
        let result = self
            .with_pins(move |pins| pins.change(&old_pin, &new_pin))
            .await;

        match &result {
            Ok(()) => {
                self.reset_failures();
                self.record_activity();
                info!("PIN changed");
            }
            Err(VaultError::PinMismatch) => self.record_failure(),
            Err(_) => {}
        }
        result
    }

    /// Unlock through the platform biometric prompt.
    ///
    /// `Ok(false)` means the sensor rejected the user; a dismissed prompt is
    /// [`VaultError::BiometricCancelled`].
    pub async fn authenticate_biometric(&self, prompt: &str) -> VaultResult<bool> {
        match self.state() {
            LockState::FirstLaunch => return Err(VaultError::NotSetUp),
            LockState::Unlocked => {
                self.record_activity();
                return Ok(true);
            }
            LockState::Locked => {}
        }

        if !self.inner.settings.is_biometric_enabled()? {
            return Err(VaultError::BiometricUnavailable(
                "biometric unlock is disabled".into(),
            ));
        }
        if !self.is_biometric_available().await {
            return Err(VaultError::BiometricUnavailable(
                "no enrolled biometric hardware".into(),
            ));
        }

        let outcome = match self.inner.biometrics.authenticate(prompt).await {
            Ok(outcome) => outcome,
            Err(lockbox_secret::Error::AuthenticationFailed(reason)) => {
                debug!("Biometric provider rejected the user: {}", reason);
                BiometricOutcome::Failure
            }
            Err(lockbox_secret::Error::NoBiometricsEnrolled) => {
                return Err(VaultError::BiometricUnavailable(
                    "no biometrics enrolled".into(),
                ));
            }
            Err(e) => return Err(VaultError::BiometricUnavailable(e.to_string())),
        };

        match outcome {
            BiometricOutcome::Success => {
                self.reset_failures();
                let minutes = self.inner.settings.auto_lock_minutes()?;
                self.enter_unlocked(AuthMethod::Biometric, minutes);
                Ok(true)
            }
            BiometricOutcome::Failure => {
                info!("Biometric authentication rejected");
                Ok(false)
            }
            BiometricOutcome::Cancelled => Err(VaultError::BiometricCancelled),
        }
    }

    /// Hardware present and at least one biometric enrolled.
    pub async fn is_biometric_available(&self) -> bool {
        let biometrics = &self.inner.biometrics;
        biometrics.has_hardware().await && biometrics.is_enrolled().await
    }

    pub async fn biometric_label(&self) -> &'static str {
        biometric_label(&self.inner.biometrics.supported_kinds().await)
    }

    /// Turn biometric unlock on or off. Enabling needs enrolled hardware.
    pub async fn set_biometric_enabled(&self, enabled: bool) -> VaultResult<()> {
        if enabled && !self.is_biometric_available().await {
            return Err(VaultError::BiometricUnavailable(
                "no enrolled biometric hardware".into(),
            ));
        }
        self.inner.settings.set_biometric_enabled(enabled)
    }

    pub fn is_biometric_enabled(&self) -> VaultResult<bool> {
        self.inner.settings.is_biometric_enabled()
    }

    /// Persist a new threshold. While unlocked the timer restarts with it.
    pub fn set_auto_lock_minutes(&self, minutes: u32) -> VaultResult<()> {
        self.inner.settings.set_auto_lock_minutes(minutes)?;
        if self.state() == LockState::Unlocked {
            self.record_activity();
            self.start_auto_lock(minutes);
        }
        Ok(())
    }

    pub fn auto_lock_minutes(&self) -> VaultResult<u32> {
        self.inner.settings.auto_lock_minutes()
    }

    pub fn is_auto_lock_running(&self) -> bool {
        self.inner.scheduler.is_running()
    }

    pub fn auth_config(&self) -> VaultResult<AuthConfig> {
        Ok(AuthConfig {
            pin_set: self.inner.pins.has_pin()?,
            biometric_enabled: self.inner.settings.is_biometric_enabled()?,
            auto_lock_minutes: self.inner.settings.auto_lock_minutes()?,
        })
    }

    /// Lock now. A no-op unless currently unlocked.
    pub fn lock(&self) {
        if !self.enter_locked("lock requested") {
            debug!("Lock requested in {} state, ignoring", self.state());
        }
    }

    /// Note user interaction. Does not restart the timer.
    pub fn record_activity(&self) {
        self.inner.scheduler.clock().touch();
    }

    pub fn idle_time(&self) -> Duration {
        self.inner.scheduler.clock().idle()
    }

    pub fn ensure_unlocked(&self) -> VaultResult<()> {
        match self.state() {
            LockState::Unlocked => Ok(()),
            LockState::Locked => Err(VaultError::Locked),
            LockState::FirstLaunch => Err(VaultError::NotSetUp),
        }
    }

    /// Consecutive failed PIN checks since the last success.
    pub fn failed_attempts(&self) -> u32 {
        self.inner.failures.lock().count
    }

    /// Forget the PIN and every auth setting and go back to `FirstLaunch`.
    ///
    /// The master key is left alone; documents stay readable after a new PIN
    /// is created.
    pub fn reset_auth(&self) -> VaultResult<()> {
        self.inner.scheduler.stop();
        self.inner.pins.reset()?;
        self.inner.settings.clear()?;
        self.inner.keys.clear_cache();
        self.reset_failures();

        warn!("Authentication reset");
        if self.set_state(LockState::FirstLaunch) {
            self.publish(LockState::FirstLaunch);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Returns false when the state was already `to`.
    fn set_state(&self, to: LockState) -> bool {
        let mut state = self.inner.state.lock();
        if *state == to {
            return false;
        }
        debug!("Lock state {} -> {}", *state, to);
        *state = to;
        true
    }

    fn enter_unlocked(&self, method: AuthMethod, auto_lock_minutes: u32) {
        self.record_activity();
        if !self.set_state(LockState::Unlocked) {
            return;
        }
        self.start_auto_lock(auto_lock_minutes);
        info!("Vault unlocked via {}", method);
        self.publish(LockState::Unlocked);
    }

    fn enter_locked(&self, reason: &str) -> bool {
        {
            let mut state = self.inner.state.lock();
            if *state != LockState::Unlocked {
                return false;
            }
            *state = LockState::Locked;
        }

        self.inner.scheduler.stop();
        if self.inner.key_cache_policy == KeyCachePolicy::ClearOnLock {
            self.inner.keys.clear_cache();
        }
        info!("Vault locked ({})", reason);
        self.publish(LockState::Locked);
        true
    }

    fn start_auto_lock(&self, minutes: u32) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.scheduler.start(minutes, move || {
            if let Some(inner) = weak.upgrade() {
                LockService { inner }.enter_locked("inactivity timeout");
            }
        });
    }

    fn publish(&self, state: LockState) {
        {
            let mut outbox = self.inner.outbox.lock();
            outbox.queue.push_back(state);
            if outbox.delivering {
                return;
            }
            outbox.delivering = true;
        }

        let _guard = DeliveryGuard(&self.inner.outbox);
        loop {
            let next = self.inner.outbox.lock().queue.pop_front();
            let Some(state) = next else { break };

            // Snapshot so listeners may (un)subscribe while being notified
            let listeners: Vec<LockListener> = self
                .inner
                .listeners
                .lock()
                .iter()
                .map(|entry| entry.listener.clone())
                .collect();
            for listener in listeners {
                listener(state);
            }
        }
    }

    // ------------------------------------------------------------------
    // Failed attempts
    // ------------------------------------------------------------------

    fn check_lockout(&self) -> VaultResult<()> {
        let failures = self.inner.failures.lock();
        if let Some(until) = failures.locked_until {
            let now = Instant::now();
            if now < until {
                let remaining = until - now;
                return Err(VaultError::TooManyAttempts {
                    retry_after_secs: remaining.as_secs().max(1),
                });
            }
        }
        Ok(())
    }

    fn record_failure(&self) {
        let mut failures = self.inner.failures.lock();
        failures.count = failures.count.saturating_add(1);
        info!("PIN rejected ({} consecutive failure(s))", failures.count);

        if let Some(policy) = self.inner.lockout {
            if failures.count % policy.max_attempts.max(1) == 0 {
                let cooldown_secs = policy.cooldown_secs.min(MAX_LOCKOUT_COOLDOWN_SECS);
                let now = Instant::now();
                failures.locked_until = Some(
                    now.checked_add(Duration::from_secs(cooldown_secs))
                        .unwrap_or(now),
                );
                warn!(
                    "{} failed PIN attempts, blocking for {}s",
                    failures.count, cooldown_secs
                );
            }
        }
    }

    fn reset_failures(&self) {
        *self.inner.failures.lock() = FailedAttempts::default();
    }

    /// Argon2 is CPU-bound; keep it off the async workers.
    async fn with_pins<T, F>(&self, f: F) -> VaultResult<T>
    where
        F: FnOnce(&PinStore) -> VaultResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pins = self.inner.pins.clone();
        tokio::task::spawn_blocking(move || f(pins.as_ref()))
            .await
            .map_err(|e| VaultError::KeyDerivation(format!("PIN hashing task failed: {}", e)))?
    }
}

/// Clears the delivering flag even if a listener panics.
struct DeliveryGuard<'a>(&'a Mutex<Outbox>);

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        let mut outbox = self.0.lock();
        outbox.delivering = false;
        if std::thread::panicking() {
            outbox.queue.clear();
        }
    }
}
