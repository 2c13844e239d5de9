use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::IntoResponse,
};

use crate::error::AppError;

use super::SharedState;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// `GET /metrics`: Prometheus text exposition.
pub async fn render_metrics(State(state): State<SharedState>) -> Result<impl IntoResponse, AppError> {
    // Gauges can lag when nothing changed since startup.
    state.metrics.observe_records(&state.monitor.list().await);

    let body = state
        .metrics
        .render()
        .map_err(|err| AppError::Unknown(format!("Failed to render metrics: {}", err)))?;

    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(PROMETHEUS_CONTENT_TYPE))],
        body,
    ))
}
