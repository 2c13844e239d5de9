use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::error::AppError;
use crate::leads::{validate_contact, LeadOutcome};
use crate::services::Contact;

use super::SharedState;

/// `POST /leads`: run one white-paper request through the pipeline.
///
/// Malformed bodies and blank required fields are rejected with `400`.
/// Downstream delivery failures are reported in the outcome, not as an
/// HTTP error.
pub async fn submit_lead(
    State(state): State<SharedState>,
    payload: Result<Json<Contact>, JsonRejection>,
) -> Result<Json<LeadOutcome>, AppError> {
    let Json(contact) = payload.map_err(|err| AppError::Validation(err.body_text()))?;
    validate_contact(&contact)?;

    Ok(Json(state.leads.submit(&contact).await))
}
