//! Periodic cleanup task
//!
//! The engine never sweeps on its own; an external scheduler calls
//! [`LockerService::cleanup`]. This module is that scheduler for callers that
//! already run a tokio runtime.
//!
//! The sweep itself is synchronous and short, so it runs inline on the timer
//! task rather than through `spawn_blocking`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::service::LockerService;

/// Handle to a running periodic cleanup
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct CleanupTask {
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl CleanupTask {
    /// Stop sweeping and wait for the task to exit
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    /// Whether the task has exited
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for CleanupTask {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Run `service.cleanup()` every `every` until the returned handle is shut
/// down or dropped
///
/// The first sweep happens one full interval after spawning.
///
/// # Panics
///
/// If called outside a tokio runtime, or if `every` is zero.
pub fn spawn_periodic_cleanup(service: Arc<LockerService>, every: Duration) -> CleanupTask {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        let start = tokio::time::Instant::now() + every;
        let mut ticker = tokio::time::interval_at(start, every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => {
                    let report = service.cleanup();
                    debug!(
                        reclaimed = report.reclaimed.len(),
                        remaining = report.remaining,
                        "periodic cleanup tick"
                    );
                }
            }
        }
    });

    CleanupTask {
        shutdown_tx,
        handle: Some(handle),
    }
}

/// Spawn the sweeper if the service configuration enables one
pub fn spawn_configured_cleanup(service: &Arc<LockerService>) -> Option<CleanupTask> {
    let every = service.config().sweep_interval()?;
    Some(spawn_periodic_cleanup(Arc::clone(service), every))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::LockerConfig;
    use crate::tier::SizeTier;

    #[tokio::test]
    async fn test_sweeper_reclaims_expired_tickets() {
        let clock = Arc::new(ManualClock::new(0));
        let config = LockerConfig::for_testing().with_retention(Duration::from_millis(100));
        let service = Arc::new(LockerService::new(config, clock.clone()).unwrap());

        let ticket = service.deposit(SizeTier::Small).unwrap();
        let task = spawn_periodic_cleanup(service.clone(), Duration::from_millis(5));

        clock.advance(Duration::from_millis(100));
        for _ in 0..200 {
            if !service.is_valid(ticket.code.as_str()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(!service.is_valid(ticket.code.as_str()));
        assert_eq!(service.available(SizeTier::Small), 10);
        task.shutdown().await;
    }

    #[tokio::test]
    async fn test_configured_cleanup_disabled_by_default() {
        let clock = Arc::new(ManualClock::new(0));
        let service = Arc::new(LockerService::new(LockerConfig::for_testing(), clock).unwrap());
        assert!(spawn_configured_cleanup(&service).is_none());
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let clock = Arc::new(ManualClock::new(0));
        let mut config = LockerConfig::for_testing();
        config.sweep_interval_ms = Some(10);
        let service = Arc::new(LockerService::new(config, clock).unwrap());

        let task = spawn_configured_cleanup(&service).unwrap();
        assert!(!task.is_finished());
        task.shutdown().await;
    }
}
