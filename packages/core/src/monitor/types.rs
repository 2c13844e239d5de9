//! Core data types for integration monitoring

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health status of a single monitored integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationStatus {
    Success,
    Failed,
    Loading,
    Retrying,
}

impl IntegrationStatus {
    /// `true` for statuses that end a retry or a bulk check.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Loading => "loading",
            Self::Retrying => "retrying",
        }
    }
}

impl fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one monitored external system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationRecord {
    pub name: String,
    pub status: IntegrationStatus,
    pub last_check: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub retry_count: u32,
}

impl IntegrationRecord {
    /// A record as it looks at startup: failed, carrying its canned message.
    pub fn seeded(seed: &IntegrationSeed, now: DateTime<Utc>) -> Self {
        Self {
            name: seed.name.clone(),
            status: IntegrationStatus::Failed,
            last_check: now,
            error_message: Some(seed.error_message.clone()),
            retry_count: seed.retry_count,
        }
    }
}

/// Startup data for one integration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationSeed {
    pub name: String,
    pub error_message: String,
    pub retry_count: u32,
}

impl IntegrationSeed {
    pub fn new(name: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error_message: error_message.into(),
            retry_count: 0,
        }
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }
}

/// The eight business systems shown on the integrations panel, in display order.
pub fn default_seeds() -> Vec<IntegrationSeed> {
    vec![
        IntegrationSeed::new(
            "CRM System (Salesforce)",
            "Authentication failed: Invalid API credentials",
        )
        .with_retry_count(3),
        IntegrationSeed::new(
            "Payment Processor (Stripe)",
            "Webhook verification failed: Invalid signature",
        )
        .with_retry_count(2),
        IntegrationSeed::new(
            "Email Marketing (Mailchimp)",
            "Rate limit exceeded: Too many requests",
        )
        .with_retry_count(1),
        IntegrationSeed::new(
            "Analytics (Google Analytics)",
            "Tracking code not loading: Ad blocker detected",
        ),
        IntegrationSeed::new("Live Chat (Intercom)", "Service unavailable: Maintenance mode"),
        IntegrationSeed::new(
            "Calendar Booking (Calendly)",
            "API timeout: Request took too long",
        )
        .with_retry_count(1),
        IntegrationSeed::new(
            "Document Signing (DocuSign)",
            "Authentication expired: Token refresh failed",
        )
        .with_retry_count(2),
        IntegrationSeed::new("Social Media Integration", "OAuth flow failed: User denied access"),
    ]
}

/// Result reported by a health probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    Unhealthy { reason: String },
}

impl ProbeOutcome {
    pub fn unhealthy(reason: impl Into<String>) -> Self {
        Self::Unhealthy { reason: reason.into() }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Which kind of check a probe is answering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Retry,
    Bulk,
}

/// Input to the status transition engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Retry,
    /// Outcome of retry number `attempt`; stale when the record has moved on.
    ResolveRetry { attempt: u32, outcome: ProbeOutcome },
    BulkCheckStart,
    BulkResolve(ProbeOutcome),
}

impl Trigger {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Retry => "retry",
            Self::ResolveRetry { .. } => "resolve_retry",
            Self::BulkCheckStart => "bulk_check_start",
            Self::BulkResolve(_) => "bulk_resolve",
        }
    }
}

/// Status counts across every integration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSummary {
    pub working: usize,
    pub failed: usize,
    pub in_progress: usize,
    pub total: usize,
}

impl MonitorSummary {
    pub fn from_records(records: &[IntegrationRecord]) -> Self {
        records.iter().fold(
            Self {
                total: records.len(),
                ..Self::default()
            },
            |mut summary, record| {
                match record.status {
                    IntegrationStatus::Success => summary.working += 1,
                    IntegrationStatus::Failed => summary.failed += 1,
                    IntegrationStatus::Loading | IntegrationStatus::Retrying => {
                        summary.in_progress += 1
                    }
                }
                summary
            },
        )
    }
}
