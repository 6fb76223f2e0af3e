// SPDX-License-Identifier: MIT
//
// HTTP error mapping.
//
// Strategies speak `VellumError`; this is the only place that knows about
// status codes. Client-class errors map to 400, password failures to 401,
// a missing engine to 503, a timed-out engine to 504, everything else to
// 500. The body is always `{"error": "..."}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use vellum_core::error::VellumError;

/// API error carrying the status code and client-facing message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<VellumError> for ApiError {
    fn from(err: VellumError) -> Self {
        let status = match &err {
            VellumError::InvalidPassword | VellumError::InvalidPasswordOrCorrupted => {
                StatusCode::UNAUTHORIZED
            }
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            VellumError::ConversionTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            VellumError::ConversionUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(%err, "operation failed");
        }
        Self::new(status, err.to_string())
    }
}
