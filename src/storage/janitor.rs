//! Background Janitor
//!
//! This module implements the background task that periodically removes
//! expired keys from the storage engine. Reads already hide keys whose
//! deadline has passed; the janitor is what actually reclaims their memory,
//! including keys that are never read again.
//!
//! ## Design
//!
//! The janitor runs as a Tokio task and:
//! 1. Waits for the next tick of a fixed-interval timer
//! 2. Calls [`Storage::sweep_expired`] once, inline
//! 3. Logs how many keys were removed
//!
//! Because the sweep runs inside the loop body, two sweeps can never overlap.
//! Ticks missed while a sweep was running are delayed rather than bursted.
//!
//! ## Lifecycle
//!
//! The task stops when the [`Janitor`] handle is stopped or dropped, or when
//! the storage itself has been dropped.

use crate::storage::Storage;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Shortest sweep interval the janitor will run at.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration for the janitor.
#[derive(Debug, Clone)]
pub struct JanitorConfig {
    /// Interval between sweeps (default: 20ms)
    pub interval: Duration,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(20),
        }
    }
}

impl JanitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sweep interval.
    ///
    /// # Example
    ///
    /// ```
    /// use mapkv::storage::JanitorConfig;
    /// use std::time::Duration;
    ///
    /// let config = JanitorConfig::new().with_interval(Duration::from_millis(250));
    /// assert_eq!(config.interval, Duration::from_millis(250));
    /// ```
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// A handle to the running janitor.
///
/// When this handle is dropped, the janitor task will be stopped, so it
/// must be kept for as long as sweeps should run.
#[derive(Debug)]
#[must_use = "dropping the Janitor stops background expiry"]
pub struct Janitor {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl Janitor {
    /// Starts the janitor as a background task.
    ///
    /// The task only holds a weak reference to `storage`.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use mapkv::storage::{Janitor, JanitorConfig, Storage};
    /// use std::sync::Arc;
    ///
    /// let storage = Arc::new(Storage::new());
    /// let janitor = Janitor::start(&storage, JanitorConfig::default());
    ///
    /// // Sweeps run in the background...
    ///
    /// janitor.shutdown().await;
    /// ```
    #[must_use = "dropping the Janitor stops background expiry"]
    pub fn start(storage: &Arc<Storage>, config: JanitorConfig) -> Self {
        let interval = if config.interval < MIN_INTERVAL {
            warn!(
                requested_ms = config.interval.as_millis(),
                "Janitor interval too small, using minimum"
            );
            MIN_INTERVAL
        } else {
            config.interval
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(janitor_loop(Arc::downgrade(storage), interval, shutdown_rx));

        info!(interval_ms = interval.as_millis(), "Janitor started");

        Self {
            shutdown_tx,
            task: Some(task),
        }
    }

    /// Signals the janitor to stop. Does not wait for it.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        // Fails only once the task has already exited
        if self.shutdown_tx.send(true).is_ok() {
            info!("Janitor stopped");
        }
    }

    /// Stops the janitor and waits for its task to finish.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Janitor task ended abnormally");
            }
        }
    }

    /// Returns true once the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map(JoinHandle::is_finished).unwrap_or(true)
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main janitor loop.
async fn janitor_loop(
    storage: Weak<Storage>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Janitor received shutdown signal");
                    return;
                }
            }
        }

        let Some(storage) = storage.upgrade() else {
            debug!("Storage dropped, janitor exiting");
            return;
        };

        let expired = storage.sweep_expired();
        if expired > 0 {
            debug!(
                expired = expired,
                keys_remaining = storage.len(),
                "Expired keys cleaned up"
            );
        }
    }
}

/// Starts the janitor with default configuration.
///
/// This is a convenience function for simple use cases.
#[must_use = "dropping the Janitor stops background expiry"]
pub fn start_janitor(storage: &Arc<Storage>) -> Janitor {
    Janitor::start(storage, JanitorConfig::default())
}
