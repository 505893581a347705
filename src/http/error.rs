//! API error type with IntoResponse.
//!
//! Every failure answers `{ "ok": false, "error": "<message>" }`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::ServerError;

/// API error with HTTP status mapping.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request body or query string (400)
    BadRequest(String),

    /// Failure reported by the service layer
    Server(ServerError),
}

impl ApiError {
    /// Status code and client-facing message.
    fn status_and_message(&self) -> (StatusCode, String) {
        let err = match self {
            Self::BadRequest(message) => return (StatusCode::BAD_REQUEST, message.clone()),
            Self::Server(err) => err,
        };

        match err {
            ServerError::InvalidInput(message) => (StatusCode::BAD_REQUEST, message.clone()),
            e if e.is_client_error() => (StatusCode::BAD_REQUEST, e.to_string()),
            ServerError::PermissionDenied(_) => (StatusCode::FORBIDDEN, err.to_string()),
            ServerError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, err.to_string()),
            ServerError::Connection { .. }
            | ServerError::Authentication(_)
            | ServerError::DatabaseNotFound(_) => {
                tracing::error!("Database unavailable: {}", err);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "database unavailable".to_string(),
                )
            }
            _ => {
                tracing::error!("Internal error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "an internal error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_client_error() {
            tracing::debug!("Request rejected ({}): {}", status, message);
        }

        (status, Json(json!({ "ok": false, "error": message }))).into_response()
    }
}

impl From<ServerError> for ApiError {
    fn from(e: ServerError) -> Self {
        Self::Server(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}
