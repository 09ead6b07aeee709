//! Periodic background refresh of the workspace

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::WorkspaceCoordinator;

/// Period used by desktop hosts
pub const AUTO_REFRESH_PERIOD: Duration = Duration::from_secs(30);

/// Handle to a background task that re-fetches the workspace on a fixed period
///
/// A tick is skipped while signed out or while another load is in flight.
/// Dropping the handle stops the task.
pub struct AutoRefresh {
    task: JoinHandle<()>,
}

impl AutoRefresh {
    pub(super) fn spawn(coordinator: WorkspaceCoordinator, period: Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !coordinator.inner.session.is_authenticated() || coordinator.is_loading() {
                    tracing::trace!("Skipping background refresh");
                    continue;
                }
                if let Err(e) = coordinator.refresh().await {
                    tracing::debug!("Background refresh failed: {}", e);
                }
            }
        });
        tracing::debug!(period_secs = period.as_secs(), "Auto-refresh started");
        Self { task }
    }

    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.task.abort();
    }
}
