use std::fmt;
use std::error::Error;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Unified application error.
///
/// This ensures all layers (config, network, parsing, request
/// validation) fail in a predictable and debuggable way.
#[derive(Debug)]
pub enum AppError {
    Config(String),
    Network(String),
    Parse(String),
    Validation(String),
    Unknown(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Config error: {}", msg),
            AppError::Network(msg) => write!(f, "Network error: {}", msg),
            AppError::Parse(msg) => write!(f, "Parse error: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Unknown(msg) => write!(f, "Unknown error: {}", msg),
        }
    }
}

impl Error for AppError {}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Network(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) | AppError::Parse(_) | AppError::Unknown(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_the_layer() {
        assert_eq!(
            AppError::Config("BIND_ADDR is invalid".into()).to_string(),
            "Config error: BIND_ADDR is invalid"
        );
        assert_eq!(
            AppError::Validation("email is required".into()).to_string(),
            "Validation error: email is required"
        );
    }

    #[test]
    fn validation_maps_to_bad_request() {
        let resp = AppError::Validation("missing".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn network_maps_to_bad_gateway() {
        assert_eq!(
            AppError::Network("timeout".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
