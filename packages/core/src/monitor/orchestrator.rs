//! Integration Monitor - retry and bulk-check orchestration
//!
//! [`IntegrationMonitor`] is the entry point the API layer talks to. It
//! applies the synchronous half of every operation immediately (so the
//! caller sees `Retrying` before `retry()` returns) and spawns a tokio task
//! for the delayed half. All record mutation goes through
//! [`IntegrationStore::update`] and the transition engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::time;

use crate::metrics::AppMetrics;
use crate::monitor::{
    clock::{Clock, TokioClock},
    config::MonitorConfig,
    error::{MonitorError, MonitorResult},
    probe::HealthProbe,
    transition,
    types::{CheckKind, IntegrationRecord, MonitorSummary, ProbeOutcome, Trigger},
};
use crate::store::IntegrationStore;

/// Cheaply clonable handle to the running monitor.
#[derive(Clone)]
pub struct IntegrationMonitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    store: IntegrationStore,
    probe: Arc<dyn HealthProbe + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
    config: MonitorConfig,
    metrics: Option<Arc<AppMetrics>>,
    checking: AtomicBool,
    shutdown: watch::Sender<bool>,
}

/// Builder for [`IntegrationMonitor`]
pub struct MonitorBuilder {
    store: IntegrationStore,
    probe: Arc<dyn HealthProbe + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
    config: MonitorConfig,
    metrics: Option<Arc<AppMetrics>>,
}

impl MonitorBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn metrics(mut self, metrics: Arc<AppMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> IntegrationMonitor {
        let (shutdown, _) = watch::channel(false);
        IntegrationMonitor {
            inner: Arc::new(MonitorInner {
                store: self.store,
                probe: self.probe,
                clock: self.clock,
                config: self.config,
                metrics: self.metrics,
                checking: AtomicBool::new(false),
                shutdown,
            }),
        }
    }
}

impl IntegrationMonitor {
    /// Start building a monitor over `store`, asking `probe` for outcomes.
    /// Defaults to [`TokioClock`] and [`MonitorConfig::default`].
    pub fn builder(
        store: IntegrationStore,
        probe: Arc<dyn HealthProbe + Send + Sync>,
    ) -> MonitorBuilder {
        MonitorBuilder {
            store,
            probe,
            clock: Arc::new(TokioClock::new()),
            config: MonitorConfig::default(),
            metrics: None,
        }
    }

    /// Start a retry of one failed integration.
    ///
    /// The record is `Retrying` (with `retry_count` bumped) by the time this
    /// returns; the outcome lands after `retry_delay`. Fails with `NotFound`
    /// for unknown names and `InvalidTransition` unless the record is
    /// `Failed`, which includes a retry for it already running.
    pub async fn retry(&self, name: &str) -> MonitorResult<IntegrationRecord> {
        let inner = &self.inner;
        let now = inner.clock.now();

        let snapshot = inner
            .store
            .update(name, |record| {
                transition::apply(record, Trigger::Retry, now)?;
                Ok(record.clone())
            })
            .await?;

        tracing::info!(
            "Retry #{} started for '{}'",
            snapshot.retry_count,
            snapshot.name
        );
        if let Some(metrics) = &inner.metrics {
            metrics.retries_started_total.inc();
        }
        inner.publish_statuses().await;

        let task = self.inner.clone();
        let name = snapshot.name.clone();
        let attempt = snapshot.retry_count;
        tokio::spawn(async move { task.resolve_retry(name, attempt).await });

        Ok(snapshot)
    }

    /// Start a bulk check over every integration.
    ///
    /// Returns `AlreadyInFlight` while a previous bulk check is running.
    pub fn check_all(&self) -> MonitorResult<()> {
        let inner = &self.inner;
        if inner
            .checking
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("Bulk check rejected: one is already in flight");
            if let Some(metrics) = &inner.metrics {
                metrics.bulk_checks_rejected_total.inc();
            }
            return Err(MonitorError::AlreadyInFlight);
        }

        tracing::info!(
            "Bulk check started across {} integrations ({} probe)",
            inner.store.len(),
            inner.probe.probe_name()
        );
        if let Some(metrics) = &inner.metrics {
            metrics.bulk_checks_total.inc();
        }

        let task = self.inner.clone();
        tokio::spawn(async move { task.run_bulk_check().await });

        Ok(())
    }

    /// Snapshot of one integration.
    pub async fn get(&self, name: &str) -> MonitorResult<IntegrationRecord> {
        self.inner.store.get(name).await
    }

    /// Snapshots of every integration in display order.
    pub async fn list(&self) -> Vec<IntegrationRecord> {
        self.inner.store.list().await
    }

    pub async fn summary(&self) -> MonitorSummary {
        MonitorSummary::from_records(&self.list().await)
    }

    /// `true` while a bulk check is in flight.
    pub fn is_checking(&self) -> bool {
        self.inner.checking.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Stop every pending retry and bulk check.
    ///
    /// Tasks that observe the signal exit without touching the store again.
    pub fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
        tracing::info!("Integration monitor shutting down");
    }

    pub fn is_shut_down(&self) -> bool {
        *self.inner.shutdown.borrow()
    }

    /// Resolves once [`shutdown`](Self::shutdown) has been called.
    pub async fn stopped(&self) {
        let mut shutdown = self.inner.shutdown.subscribe();
        // The sender lives in `inner`, so this only errs if it is dropped.
        let _ = shutdown.wait_for(|stop| *stop).await;
    }
}

/// Clears the bulk-check flag however the sweep ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl MonitorInner {
    /// Sleep for `duration` unless shutdown arrives first.
    /// Returns `false` when the caller should stop.
    async fn pause(&self, shutdown: &mut watch::Receiver<bool>, duration: std::time::Duration) -> bool {
        let stopped = tokio::select! {
            _ = self.clock.sleep(duration) => false,
            _ = shutdown.wait_for(|stop| *stop) => true,
        };
        !stopped && !*shutdown.borrow()
    }

    /// Ask the probe about `name`, giving up after `probe_timeout`.
    async fn check_with_deadline(&self, name: &str, kind: CheckKind) -> ProbeOutcome {
        let limit = self.config.probe_timeout;
        match time::timeout(limit, self.probe.check(name, kind)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!("Health check for '{}' timed out after {}ms", name, limit.as_millis());
                ProbeOutcome::unhealthy(format!("Health check timed out after {}ms", limit.as_millis()))
            }
        }
    }

    async fn resolve_retry(&self, name: String, attempt: u32) {
        let mut shutdown = self.shutdown.subscribe();
        if !self.pause(&mut shutdown, self.config.retry_delay).await {
            tracing::debug!("Retry of '{}' abandoned on shutdown", name);
            return;
        }

        let outcome = self.check_with_deadline(&name, CheckKind::Retry).await;
        if *shutdown.borrow() {
            return;
        }

        let now = self.clock.now();
        let resolved = self
            .store
            .update(&name, |record| {
                transition::apply(record, Trigger::ResolveRetry { attempt, outcome }, now)?;
                Ok(record.clone())
            })
            .await;

        match resolved {
            Ok(record) => {
                tracing::info!(
                    "Retry #{} for '{}' resolved: {}",
                    record.retry_count,
                    record.name,
                    record.status
                );
                if let Some(metrics) = &self.metrics {
                    metrics
                        .retry_outcomes_total
                        .with_label_values(&[record.status.as_str()])
                        .inc();
                }
                self.publish_statuses().await;
            }
            // A bulk check or a later retry took the record over.
            Err(err) => tracing::debug!("Dropping stale resolution of retry #{}: {}", attempt, err),
        }
    }

    async fn run_bulk_check(&self) {
        let _in_flight = InFlightGuard(&self.checking);
        let mut shutdown = self.shutdown.subscribe();

        for name in self.store.names() {
            if !self.pause(&mut shutdown, self.config.stagger_delay).await {
                tracing::debug!("Bulk check abandoned on shutdown");
                return;
            }
            let now = self.clock.now();
            if let Err(err) = self
                .store
                .update(name, |record| transition::apply(record, Trigger::BulkCheckStart, now))
                .await
            {
                tracing::error!("Bulk check could not start '{}': {}", name, err);
            }
            tracing::debug!("Checking '{}'", name);
            self.publish_statuses().await;
        }

        if !self.pause(&mut shutdown, self.config.resolve_delay).await {
            tracing::debug!("Bulk check abandoned on shutdown");
            return;
        }

        // Every probe runs at once; nothing is written until all have answered.
        let names = self.store.names();
        let checks = join_all(
            names
                .iter()
                .map(|name| self.check_with_deadline(name, CheckKind::Bulk)),
        );
        let outcomes = tokio::select! {
            outcomes = checks => outcomes,
            _ = shutdown.wait_for(|stop| *stop) => Vec::new(),
        };
        if *shutdown.borrow() {
            tracing::debug!("Bulk check abandoned on shutdown");
            return;
        }

        let now = self.clock.now();
        for (name, outcome) in names.iter().zip(outcomes) {
            if let Err(err) = self
                .store
                .update(name, |record| {
                    transition::apply(record, Trigger::BulkResolve(outcome), now)
                })
                .await
            {
                tracing::error!("Bulk check could not resolve '{}': {}", name, err);
            }
        }

        self.publish_statuses().await;
        let summary = MonitorSummary::from_records(&self.store.list().await);
        tracing::info!(
            "Bulk check finished: {} working, {} failed of {}",
            summary.working,
            summary.failed,
            summary.total
        );
    }

    async fn publish_statuses(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.observe_records(&self.store.list().await);
        }
    }
}
