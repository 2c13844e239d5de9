//! Prometheus metrics registry for the integration monitor.
//!
//! [`AppMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and pass it
//! to the monitor, the lead pipeline and the HTTP router.
//!
//! Exposed at `GET /metrics` in Prometheus text exposition format
//! (`text/plain; version=0.0.4`).

use prometheus::{Counter, CounterVec, GaugeVec, Opts, Registry};

use crate::monitor::types::{IntegrationRecord, IntegrationStatus, MonitorSummary};

/// All application-level Prometheus metrics.
pub struct AppMetrics {
    /// Retries accepted by the monitor.
    pub retries_started_total: Counter,
    /// Retry resolutions, labelled by resulting status.
    pub retry_outcomes_total: CounterVec,
    /// Bulk checks started.
    pub bulk_checks_total: Counter,
    /// Bulk checks rejected because one was already running.
    pub bulk_checks_rejected_total: Counter,
    /// Current number of integrations in each status.
    pub integrations_by_status: GaugeVec,
    /// Lead submissions, labelled by outcome.
    pub leads_total: CounterVec,
    /// HTTP request count, labelled by method, route and status code.
    pub http_requests_total: CounterVec,
    /// The registry that owns all of the above metrics.
    pub registry: Registry,
}

impl AppMetrics {
    /// Create and register all metrics. Returns an error if any metric
    /// name is invalid or duplicated.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let retries_started_total = Counter::with_opts(Opts::new(
            "integration_monitor_retries_started_total",
            "Retries accepted by the integration monitor",
        ))?;

        let retry_outcomes_total = CounterVec::new(
            Opts::new(
                "integration_monitor_retry_outcomes_total",
                "Retry resolutions by resulting status",
            ),
            &["status"],
        )?;

        let bulk_checks_total = Counter::with_opts(Opts::new(
            "integration_monitor_bulk_checks_total",
            "Bulk checks started",
        ))?;

        let bulk_checks_rejected_total = Counter::with_opts(Opts::new(
            "integration_monitor_bulk_checks_rejected_total",
            "Bulk checks rejected while another was in flight",
        ))?;

        let integrations_by_status = GaugeVec::new(
            Opts::new(
                "integration_monitor_integrations",
                "Integrations currently in each status",
            ),
            &["status"],
        )?;

        let leads_total = CounterVec::new(
            Opts::new("integration_monitor_leads_total", "Lead submissions by outcome"),
            &["outcome"],
        )?;

        let http_requests_total = CounterVec::new(
            Opts::new(
                "integration_monitor_http_requests_total",
                "HTTP requests by method, route, and status",
            ),
            &["method", "route", "status"],
        )?;

        registry.register(Box::new(retries_started_total.clone()))?;
        registry.register(Box::new(retry_outcomes_total.clone()))?;
        registry.register(Box::new(bulk_checks_total.clone()))?;
        registry.register(Box::new(bulk_checks_rejected_total.clone()))?;
        registry.register(Box::new(integrations_by_status.clone()))?;
        registry.register(Box::new(leads_total.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;

        Ok(Self {
            retries_started_total,
            retry_outcomes_total,
            bulk_checks_total,
            bulk_checks_rejected_total,
            integrations_by_status,
            leads_total,
            http_requests_total,
            registry,
        })
    }

    /// Overwrite the per-status gauge from a fresh snapshot.
    pub fn observe_records(&self, records: &[IntegrationRecord]) {
        let summary = MonitorSummary::from_records(records);
        let retrying = records
            .iter()
            .filter(|r| r.status == IntegrationStatus::Retrying)
            .count();

        let counts = [
            (IntegrationStatus::Success, summary.working),
            (IntegrationStatus::Failed, summary.failed),
            (IntegrationStatus::Loading, summary.in_progress - retrying),
            (IntegrationStatus::Retrying, retrying),
        ];
        for (status, count) in counts {
            self.integrations_by_status
                .with_label_values(&[status.as_str()])
                .set(count as f64);
        }
    }

    /// Render all metrics as Prometheus text format (for the `/metrics` endpoint).
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(name: &str, status: IntegrationStatus) -> IntegrationRecord {
        IntegrationRecord {
            name: name.to_string(),
            status,
            last_check: Utc::now(),
            error_message: (status == IntegrationStatus::Failed).then(|| "down".to_string()),
            retry_count: 0,
        }
    }

    #[test]
    fn all_metrics_register_without_error() {
        let metrics = AppMetrics::new();
        assert!(metrics.is_ok(), "AppMetrics::new() failed: {:?}", metrics.err());
    }

    #[test]
    fn render_contains_counter_after_increment() {
        let metrics = AppMetrics::new().unwrap();
        metrics.retries_started_total.inc();
        let output = metrics.render().unwrap();
        assert!(output.contains("integration_monitor_retries_started_total 1"));
    }

    #[test]
    fn observe_records_sets_status_gauges() {
        let metrics = AppMetrics::new().unwrap();
        metrics.observe_records(&[
            record("a", IntegrationStatus::Success),
            record("b", IntegrationStatus::Failed),
            record("c", IntegrationStatus::Failed),
            record("d", IntegrationStatus::Retrying),
            record("e", IntegrationStatus::Loading),
        ]);

        let get = |status: &str| {
            metrics
                .integrations_by_status
                .with_label_values(&[status])
                .get()
        };
        assert!((get("success") - 1.0).abs() < f64::EPSILON);
        assert!((get("failed") - 2.0).abs() < f64::EPSILON);
        assert!((get("retrying") - 1.0).abs() < f64::EPSILON);
        assert!((get("loading") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn labelled_counters_increment_independently() {
        let metrics = AppMetrics::new().unwrap();
        metrics.leads_total.with_label_values(&["success"]).inc();
        metrics.leads_total.with_label_values(&["error"]).inc_by(2.0);
        assert!((metrics.leads_total.with_label_values(&["success"]).get() - 1.0).abs() < f64::EPSILON);
        assert!((metrics.leads_total.with_label_values(&["error"]).get() - 2.0).abs() < f64::EPSILON);
    }
}
