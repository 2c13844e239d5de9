//! Timing configuration for the integration monitor

use std::time::Duration;

/// Delays used by the retry and bulk-check orchestrators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Wait between `retry()` and its resolution.
    pub retry_delay: Duration,
    /// Pause before each record enters `Loading` during a bulk check.
    pub stagger_delay: Duration,
    /// Wait between the last `Loading` transition and the batch resolution.
    pub resolve_delay: Duration,
    /// Longest a single probe call may take before it counts as unhealthy.
    pub probe_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_millis(2_000),
            stagger_delay: Duration::from_millis(500),
            resolve_delay: Duration::from_millis(3_000),
            probe_timeout: Duration::from_millis(10_000),
        }
    }
}

impl MonitorConfig {
    /// Time a bulk check over `records` integrations takes to resolve when
    /// every probe answers promptly.
    pub fn bulk_check_duration(&self, records: usize) -> Duration {
        let records = u32::try_from(records).unwrap_or(u32::MAX);
        self.stagger_delay.saturating_mul(records) + self.resolve_delay
    }
}
