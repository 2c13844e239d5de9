//! Status transition engine
//!
//! Pure state-machine logic for a single [`IntegrationRecord`]. Nothing in
//! here sleeps, draws random numbers or touches shared state: the
//! orchestrators decide *when* a trigger fires and *what* the probe said,
//! this module only decides what that means for the record.
//!
//! | From     | Trigger        | To               |
//! |----------|----------------|------------------|
//! | Failed   | Retry          | Retrying         |
//! | Retrying | ResolveRetry   | Success / Failed |
//! | any      | BulkCheckStart | Loading          |
//! | Loading  | BulkResolve    | Success / Failed |
//!
//! `ResolveRetry` only lands on the attempt that started it.

use chrono::{DateTime, Utc};

use crate::monitor::{
    error::{MonitorError, MonitorResult},
    types::{IntegrationRecord, IntegrationStatus, ProbeOutcome, Trigger},
};

/// Apply `trigger` to `record`, mutating it in place.
///
/// On error the record is left exactly as it was.
pub fn apply(
    record: &mut IntegrationRecord,
    trigger: Trigger,
    now: DateTime<Utc>,
) -> MonitorResult<()> {
    match (record.status, trigger) {
        (IntegrationStatus::Failed, Trigger::Retry) => {
            record.status = IntegrationStatus::Retrying;
            record.retry_count = record.retry_count.saturating_add(1);
            record.error_message = None;
        }
        (IntegrationStatus::Retrying, Trigger::ResolveRetry { attempt, outcome })
            if attempt == record.retry_count =>
        {
            let message = format!("Retry attempt {} failed", record.retry_count);
            resolve(record, outcome.is_healthy(), message, now);
        }
        (_, Trigger::BulkCheckStart) => {
            record.status = IntegrationStatus::Loading;
            record.error_message = None;
        }
        (IntegrationStatus::Loading, Trigger::BulkResolve(outcome)) => match outcome {
            ProbeOutcome::Healthy => resolve(record, true, String::new(), now),
            ProbeOutcome::Unhealthy { reason } => resolve(record, false, reason, now),
        },
        (from, trigger) => {
            return Err(MonitorError::invalid_transition(
                record.name.clone(),
                from,
                trigger.label(),
            ));
        }
    }

    Ok(())
}

fn resolve(record: &mut IntegrationRecord, healthy: bool, failure: String, now: DateTime<Utc>) {
    record.last_check = now;
    if healthy {
        record.status = IntegrationStatus::Success;
        record.error_message = None;
    } else {
        record.status = IntegrationStatus::Failed;
        record.error_message = Some(failure);
    }
}

/// `true` when `error_message` is present exactly for failed records.
pub fn error_message_consistent(record: &IntegrationRecord) -> bool {
    record.error_message.is_some() == (record.status == IntegrationStatus::Failed)
}
