//! Health check endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use super::AppState;
use crate::database::{pool_status, PoolStatus};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    pub pool: PoolStatus,
}

/// GET /health
///
/// Answers 503 with status "degraded" when the database does not respond.
async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let executor = state.service.executor();
    let reachable = match executor.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            false
        }
    };

    let (code, status, database) = if reachable {
        (StatusCode::OK, "ok", "reachable")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unreachable")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            database,
            pool: pool_status(executor.pool()),
        }),
    )
}

/// Health routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::{call, get_request, unreachable_state};

    #[tokio::test]
    async fn health_reports_unreachable_database() {
        let app = router().with_state(unreachable_state());
        let (status, body) = call(app, get_request("/health")).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["database"], "unreachable");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["pool"]["maxConnections"].is_number());
    }
}
