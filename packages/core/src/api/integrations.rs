//! Integration status endpoints.
//!
//! Routes:
//! - `GET  /integrations`              list every record in display order
//! - `GET  /integrations/summary`      status counts plus the bulk-check flag
//! - `GET  /integrations/:name`        one record
//! - `POST /integrations/:name/retry`  start a retry of a failed integration
//! - `POST /integrations/check`        start a bulk check

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;
use crate::monitor::{IntegrationRecord, MonitorError, MonitorSummary};

use super::headers::{compute_etag, if_none_match_matches, last_modified};
use super::SharedState;

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let status = match &self {
            MonitorError::NotFound { .. } => StatusCode::NOT_FOUND,
            MonitorError::InvalidTransition { .. } | MonitorError::AlreadyInFlight => {
                StatusCode::CONFLICT
            }
            MonitorError::DuplicateName { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub summary: MonitorSummary,
    pub checking: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckStartedResponse {
    pub checking: bool,
    /// How long until every record has resolved.
    pub expected_duration_ms: u64,
}

/// `GET /integrations`
pub async fn list_integrations(
    State(state): State<SharedState>,
    request_headers: HeaderMap,
) -> Result<Response, AppError> {
    let records = state.monitor.list().await;
    let body = serde_json::to_vec(&records).map_err(|err| AppError::Parse(err.to_string()))?;
    let etag = compute_etag(&body);

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response_headers.insert(
        header::ETAG,
        HeaderValue::from_str(&etag).map_err(|err| AppError::Unknown(err.to_string()))?,
    );
    if let Some(value) = newest_check(&records).and_then(last_modified) {
        response_headers.insert(header::LAST_MODIFIED, value);
    }

    if if_none_match_matches(&request_headers, &etag) {
        return Ok((StatusCode::NOT_MODIFIED, response_headers).into_response());
    }

    response_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok((StatusCode::OK, response_headers, body).into_response())
}

fn newest_check(records: &[IntegrationRecord]) -> Option<chrono::DateTime<chrono::Utc>> {
    records.iter().map(|record| record.last_check).max()
}

/// `GET /integrations/summary`
pub async fn integration_summary(State(state): State<SharedState>) -> Json<SummaryResponse> {
    Json(SummaryResponse {
        summary: state.monitor.summary().await,
        checking: state.monitor.is_checking(),
    })
}

/// `GET /integrations/:name`
pub async fn get_integration(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<IntegrationRecord>, MonitorError> {
    state.monitor.get(&name).await.map(Json)
}

/// `POST /integrations/:name/retry`
pub async fn retry_integration(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<IntegrationRecord>), MonitorError> {
    let record = state.monitor.retry(&name).await?;
    Ok((StatusCode::ACCEPTED, Json(record)))
}

/// `POST /integrations/check`
pub async fn check_all(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<CheckStartedResponse>), MonitorError> {
    state.monitor.check_all()?;

    let records = state.monitor.list().await.len();
    let expected = state.monitor.config().bulk_check_duration(records);
    Ok((
        StatusCode::ACCEPTED,
        Json(CheckStartedResponse {
            checking: true,
            expected_duration_ms: u64::try_from(expected.as_millis()).unwrap_or(u64::MAX),
        }),
    ))
}
