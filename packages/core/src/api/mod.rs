//! HTTP API.
//!
//! [`router`] assembles every route over one shared [`ApiState`]. Each
//! matched request is counted in `http_requests_total`.

pub mod headers;
pub mod health;
pub mod integrations;
pub mod leads;
pub mod metrics;

use std::sync::Arc;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::leads::LeadPipeline;
use crate::metrics::AppMetrics;
use crate::monitor::IntegrationMonitor;

pub struct ApiState {
    pub monitor: IntegrationMonitor,
    pub leads: Arc<LeadPipeline>,
    pub metrics: Arc<AppMetrics>,
}

pub type SharedState = Arc<ApiState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(metrics::render_metrics))
        .route("/integrations", get(integrations::list_integrations))
        .route("/integrations/summary", get(integrations::integration_summary))
        .route("/integrations/check", post(integrations::check_all))
        .route("/integrations/:name", get(integrations::get_integration))
        .route("/integrations/:name/retry", post(integrations::retry_integration))
        .route("/leads", post(leads::submit_lead))
        .route_layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn track_requests(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    state
        .metrics
        .http_requests_total
        .with_label_values(&[method.as_str(), route.as_str(), response.status().as_str()])
        .inc();
    response
}
