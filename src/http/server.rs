//! Axum server setup.
//!
//! Router with CORS, request tracing, timeout and body limit layers, served
//! until the shutdown controller fires.

use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{BoxError, Router};
use tokio::net::TcpListener;
use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::{health, routes, ApiError, AppState};
use crate::config::HttpConfig;
use crate::error::ServerError;
use crate::shutdown::SharedShutdownController;

/// Build the application router with all layers applied.
pub fn build_router(state: Arc<AppState>, config: &HttpConfig) -> Router {
    let timeout_seconds = config.request_timeout_seconds;
    let mut app = Router::new()
        .merge(health::router())
        .merge(routes::router())
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                    request_error(err, timeout_seconds)
                }))
                .layer(TimeoutLayer::new(Duration::from_secs(timeout_seconds))),
        )
        .with_state(state);

    if config.enable_cors {
        app = app.layer(cors_layer(&config.cors_origins));
    }

    if config.enable_tracing {
        app = app.layer(TraceLayer::new_for_http());
    }

    app
}

/// Map a middleware failure to the JSON error shape.
fn request_error(err: BoxError, seconds: u64) -> ApiError {
    if err.is::<Elapsed>() {
        warn!("Request exceeded {} seconds", seconds);
        ApiError::Server(ServerError::Timeout(format!(
            "request exceeded {} seconds",
            seconds
        )))
    } else {
        ApiError::Server(ServerError::internal(format!(
            "Unhandled middleware error: {}",
            err
        )))
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        warn!("CORS: no origins configured, all origins allowed");
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("CORS: ignoring invalid origin '{}'", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Serve the API until shutdown, draining in-flight requests.
pub async fn serve(
    state: Arc<AppState>,
    config: &HttpConfig,
    controller: SharedShutdownController,
) -> Result<(), ServerError> {
    let app = build_router(state, config);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ServerError::config(format!("Failed to bind {}: {}", addr, e)))?;

    info!("HTTP server listening on http://{}", addr);
    info!("Health endpoint: http://{}/health", addr);
    if config.enable_tracing {
        info!("Request tracing enabled");
    }

    let mut signal = controller.signal();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        signal.recv().await;
        info!("HTTP server received shutdown signal");
    });
    let task = tokio::spawn(async move { server.await });

    match controller.drain(task).await {
        Some(Err(e)) => Err(ServerError::internal(format!("HTTP server error: {}", e))),
        Some(Ok(())) | None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::{call, get_request, json_request, unreachable_state};
    use crate::shutdown::new_shutdown_controller;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn router_serves_api_and_health() {
        let app = build_router(unreachable_state(), &HttpConfig::default());

        let (status, body) = call(app.clone(), json_request("/api/query", "{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_ne!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn body_limit_is_enforced() {
        let config = HttpConfig {
            max_body_size: 16,
            ..HttpConfig::default()
        };
        let app = build_router(unreachable_state(), &config);

        let body = format!(r#"{{"sql": "SELECT {}"}}"#, "x".repeat(64));
        let (status, body) = call(app, json_request("/api/query", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn request_timeout_answers_json_504() {
        let config = HttpConfig {
            request_timeout_seconds: 0,
            ..HttpConfig::default()
        };
        let app = build_router(unreachable_state(), &config);

        let (status, body) = call(app, get_request("/api/tables")).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "Timeout: request exceeded 0 seconds");
    }

    #[test]
    fn middleware_errors_map_to_api_errors() {
        let err = request_error(Box::new(Elapsed::new()), 60);
        assert!(matches!(err, ApiError::Server(ServerError::Timeout(_))));

        let err = request_error("boom".into(), 60);
        assert!(matches!(err, ApiError::Server(ServerError::Internal(_))));
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let config = HttpConfig {
            enable_cors: true,
            cors_origins: vec!["http://localhost:5173".to_string()],
            ..HttpConfig::default()
        };
        let app = build_router(unreachable_state(), &config);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/tables")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("http://localhost:5173")
        );
    }

    #[tokio::test]
    async fn serve_stops_on_shutdown() {
        let config = HttpConfig {
            port: 0,
            ..HttpConfig::default()
        };
        let controller = new_shutdown_controller(Duration::from_secs(1));
        controller.shutdown();

        let result = serve(unreachable_state(), &config, controller).await;
        assert!(result.is_ok());
    }
}
