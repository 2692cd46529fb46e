//! Background cleanup on a fixed interval

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::core::FixtureCache;

/// Handle to a running maintenance task
#[derive(Debug)]
pub struct MaintenanceTask {
    handle: JoinHandle<()>,
    shutdown: Arc<Notify>,
}

impl MaintenanceTask {
    /// Signals the task to stop and waits for it to finish
    pub async fn stop(self) {
        self.shutdown.notify_one();
        let _ = self.handle.await;
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Runs [`FixtureCache::cleanup`] every `every` until stopped.
///
/// The first pass happens one full interval after spawning.
pub fn spawn_maintenance(cache: Arc<FixtureCache>, every: Duration) -> MaintenanceTask {
    let shutdown = Arc::new(Notify::new());
    let signal = shutdown.clone();

    let handle = tokio::spawn(async move {
        info!("Cache maintenance running every {}s", every.as_secs());
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the immediate first tick
        interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = signal.notified() => {
                    info!("Cache maintenance stopping");
                    break;
                }

                _ = interval.tick() => {
                    let report = cache.cleanup().await;
                    debug!("Maintenance pass finished: {:?}", report);
                }
            }
        }
    });

    MaintenanceTask { handle, shutdown }
}
