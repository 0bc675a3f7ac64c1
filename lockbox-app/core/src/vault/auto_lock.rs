//! Inactivity auto-lock.
//!
//! A spawned task wakes up every `poll_interval`, compares the idle time on
//! the shared [`ActivityClock`] against the threshold and fires the timeout
//! callback once. The check can run up to one poll interval late.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::storage::MAX_AUTO_LOCK_POLL_SECS;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(MAX_AUTO_LOCK_POLL_SECS);

/// Timestamp of the last recorded user interaction.
///
/// Clones share the same timestamp.
#[derive(Debug, Clone)]
pub struct ActivityClock {
    last: Arc<Mutex<Instant>>,
}

impl ActivityClock {
    pub fn new() -> Self {
        Self {
            last: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Record activity now.
    pub fn touch(&self) {
        *self.last.lock() = Instant::now();
    }

    /// Time since the last recorded activity.
    pub fn idle(&self) -> Duration {
        Instant::now().saturating_duration_since(*self.last.lock())
    }
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AutoLockScheduler {
    poll_interval: Duration,
    clock: ActivityClock,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AutoLockScheduler {
    /// `poll_interval` is clamped to between 1 ms and one hour.
    pub fn new(poll_interval: Duration, clock: ActivityClock) -> Self {
        Self {
            poll_interval: poll_interval.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL),
            clock,
            task: Mutex::new(None),
        }
    }

    pub fn clock(&self) -> &ActivityClock {
        &self.clock
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Start polling, replacing any poll already running.
    ///
    /// A threshold of 0 minutes disables auto-lock: the previous poll is
    /// stopped and nothing new is started. `on_timeout` runs at most once,
    /// on the scheduler task, after which the poll ends by itself.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(&self, threshold_minutes: u32, on_timeout: F)
    where
        F: Fn() + Send + 'static,
    {
        self.stop();

        if threshold_minutes == 0 {
            info!("Auto-lock disabled");
            return;
        }

        let threshold = Duration::from_secs(u64::from(threshold_minutes) * 60);
        let clock = self.clock.clone();
        let poll_interval = self.poll_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = match Instant::now().checked_add(poll_interval) {
                Some(first) => tokio::time::interval_at(first, poll_interval),
                None => tokio::time::interval(poll_interval),
            };
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let idle = clock.idle();
                if idle >= threshold {
                    info!("Idle for {}s, auto-locking", idle.as_secs());
                    on_timeout();
                    break;
                }
            }
        });

        *self.task.lock() = Some(handle);
        info!(
            "Auto-lock timer started for {} minute(s) of inactivity",
            threshold_minutes
        );
    }

    /// Cancel the running poll, if any.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            debug!("Auto-lock timer stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for AutoLockScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
