//! REST surface over [`TableService`].

mod error;
mod health;
mod routes;
mod server;

pub use error::ApiError;
pub use server::{build_router, serve};

use crate::service::TableService;

/// Shared application state
pub struct AppState {
    pub service: TableService,
}

impl AppState {
    /// Wrap a service.
    pub fn new(service: TableService) -> Self {
        Self { service }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::AppState;
    use crate::config::{BrowseConfig, DatabaseConfig};
    use crate::database::{create_lazy_pool, QueryExecutor};
    use crate::service::TableService;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    /// State whose pool points at a closed port.
    pub fn unreachable_state() -> Arc<AppState> {
        let mut config = DatabaseConfig::new("127.0.0.1", "unused");
        config.port = 1;
        config.pool.connection_timeout = Duration::from_millis(300);
        let executor = QueryExecutor::new(create_lazy_pool(&config), Duration::from_secs(5));
        Arc::new(AppState::new(TableService::new(
            Arc::new(executor),
            BrowseConfig::default(),
        )))
    }

    pub fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub fn json_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// Send one request and decode the JSON response.
    pub async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}
