//! Periodic bulk-check scheduler.
//!
//! Optional background loop that asks the monitor for a bulk check on a
//! fixed interval, so the dashboard stays fresh without anyone pressing
//! "Check all".

use std::time::Duration;

use tokio::signal;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::monitor::{IntegrationMonitor, MonitorError};

/// Longest accepted interval between periodic checks (one week).
pub const MAX_INTERVAL_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Run the periodic check loop.
///
/// The first check fires one full interval after start. A tick that lands
/// while a bulk check is still running is skipped, not queued. Intervals
/// are clamped to `1..=MAX_INTERVAL_SECONDS`.
///
/// Runs until `Ctrl+C` (SIGINT) is received or the monitor shuts down.
pub async fn run_periodic_checks(monitor: IntegrationMonitor, interval_seconds: u64) {
    let period = Duration::from_secs(interval_seconds.clamp(1, MAX_INTERVAL_SECONDS));
    let now = Instant::now();
    let start = now.checked_add(period).unwrap_or(now);
    let mut interval = time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!("Periodic checks started (interval: {}s)", period.as_secs());

    loop {
        tokio::select! {
            _ = interval.tick() => {
                check_once(&monitor);
            }

            _ = monitor.stopped() => {
                tracing::info!("Monitor stopped. Ending periodic checks.");
                break;
            }

            _ = signal::ctrl_c() => {
                tracing::info!("Shutdown signal received. Stopping periodic checks.");
                break;
            }
        }
    }

    tracing::info!("Periodic checks stopped cleanly");
}

/// Start one bulk check. Returns `false` when the tick was skipped.
pub fn check_once(monitor: &IntegrationMonitor) -> bool {
    match monitor.check_all() {
        Ok(()) => true,
        Err(MonitorError::AlreadyInFlight) => {
            tracing::debug!("Periodic check skipped: bulk check already running");
            false
        }
        Err(err) => {
            tracing::error!("Periodic check failed to start: {}", err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use tokio::time::sleep;

    use crate::monitor::{IntegrationSeed, IntegrationStatus, MonitorConfig, SimulatedProbe};
    use crate::store::IntegrationStore;

    fn always_healthy_monitor() -> IntegrationMonitor {
        let seeds = vec![
            IntegrationSeed::new("CRM", "Connection timeout"),
            IntegrationSeed::new("Email", "Invalid API key"),
        ];
        let store = IntegrationStore::from_seeds(&seeds, Utc::now()).unwrap();
        let probe = Arc::new(SimulatedProbe::with_rates(1.0, 1.0, Some(3)));
        IntegrationMonitor::builder(store, probe)
            .config(MonitorConfig {
                retry_delay: Duration::from_millis(10),
                stagger_delay: Duration::from_millis(10),
                resolve_delay: Duration::from_millis(10),
                ..MonitorConfig::default()
            })
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn check_once_skips_while_a_check_is_running() {
        let monitor = always_healthy_monitor();

        assert!(check_once(&monitor));
        assert!(!check_once(&monitor));

        sleep(Duration::from_millis(100)).await;
        assert!(check_once(&monitor));
    }

    #[tokio::test(start_paused = true)]
    async fn loop_waits_one_interval_then_checks() {
        let monitor = always_healthy_monitor();
        let handle = tokio::spawn(run_periodic_checks(monitor.clone(), 1));

        sleep(Duration::from_millis(500)).await;
        assert!(monitor
            .list()
            .await
            .iter()
            .all(|r| r.status == IntegrationStatus::Failed));

        sleep(Duration::from_millis(600)).await;
        assert!(monitor
            .list()
            .await
            .iter()
            .all(|r| r.status == IntegrationStatus::Success));

        monitor.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn huge_interval_is_clamped_and_loop_still_stops() {
        let monitor = always_healthy_monitor();
        let handle = tokio::spawn(run_periodic_checks(monitor.clone(), u64::MAX));

        sleep(Duration::from_secs(60)).await;
        assert!(!handle.is_finished());
        assert!(monitor
            .list()
            .await
            .iter()
            .all(|r| r.status == IntegrationStatus::Failed));

        monitor.shutdown();
        handle.await.unwrap();
    }
}
