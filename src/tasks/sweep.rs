//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache entries.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::SharedStore;

/// Handle to a running sweep loop.
///
/// Dropping the handle without calling [`SweepTask::shutdown`] aborts the
/// loop; `shutdown` is the orderly path and guarantees no sweep runs after it
/// returns.
#[derive(Debug)]
pub struct SweepTask {
    stop: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl SweepTask {
    /// Spawns a loop that calls `sweep_expired` every `interval`.
    ///
    /// The first sweep happens one full interval after spawning.
    ///
    /// # Example
    /// ```ignore
    /// let task = SweepTask::spawn(store.clone(), Duration::from_secs(300));
    /// // Later, during shutdown:
    /// task.shutdown().await;
    /// ```
    pub fn spawn(store: SharedStore, interval: Duration) -> Self {
        let (stop, mut stopped) = watch::channel(false);

        let handle = tokio::spawn(async move {
            info!("Starting expiry sweep with interval of {:?}", interval);

            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = stopped.changed() => {
                        if changed.is_err() || *stopped.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                let removed = store.write().await.sweep_expired();
                if removed > 0 {
                    info!("Expiry sweep: removed {} expired entries", removed);
                } else {
                    debug!("Expiry sweep: no expired entries found");
                }
            }

            debug!("Expiry sweep stopped");
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stops the loop and waits for it to exit.
    pub async fn shutdown(mut self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!("Expiry sweep task ended abnormally: {}", e);
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map(|h| h.is_finished()).unwrap_or(true)
    }
}

impl Drop for SweepTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
