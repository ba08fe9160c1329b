use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payv1_rs::transport::DEFAULT_TIMEOUT;
use payv1_rs::{Action, ApiResult, DispatchError, DispatchRequest, Dispatcher, HttpTransport};

/// Server configuration
struct ServerConfig {
    port: u16,
    http_timeout: Duration,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            http_timeout: env::var("PAYV1_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}

/// Application state shared across all requests
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
    metrics: Arc<Metrics>,
}

/// Server metrics
struct Metrics {
    total_requests: AtomicU64,
    requests_in_flight: AtomicU64,
    failed_dispatches: AtomicU64,
    start_time: Instant,
}

/// RAII guard for tracking in-flight requests
struct RequestGuard<'a>(&'a AtomicU64);

impl<'a> Drop for RequestGuard<'a> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=info,payv1_rs=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    // Build the shared dispatcher
    let transport = HttpTransport::with_timeout(config.http_timeout)
        .context("Failed to build HTTP client")?;
    let dispatcher = Arc::new(Dispatcher::with_transport(transport));
    tracing::info!(
        "Dispatcher ready ({} actions, upstream timeout {:?})",
        Action::ALL.len(),
        config.http_timeout
    );

    let app = build_app(dispatcher);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Build the Axum application with routes and middleware
fn build_app(dispatcher: Arc<Dispatcher>) -> Router {
    let metrics = Arc::new(Metrics {
        total_requests: AtomicU64::new(0),
        requests_in_flight: AtomicU64::new(0),
        failed_dispatches: AtomicU64::new(0),
        start_time: Instant::now(),
    });

    let state = AppState {
        dispatcher,
        metrics,
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/api/dispatch", post(dispatch))
        .route("/api/actions", get(list_actions))
        .route("/api/metrics", get(get_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Run one action against the payment API and return the full trace.
///
/// Upstream failures, including a rejected token, come back as 200 with
/// `success: false`; only input and transport errors change the status code.
async fn dispatch(
    State(state): State<AppState>,
    payload: Result<Json<DispatchRequest>, JsonRejection>,
) -> Result<Json<ApiResult>, ApiError> {
    state.metrics.total_requests.fetch_add(1, Ordering::Relaxed);
    state
        .metrics
        .requests_in_flight
        .fetch_add(1, Ordering::Relaxed);
    let _guard = RequestGuard(&state.metrics.requests_in_flight);

    // Malformed bodies still get the JSON error envelope
    let Json(request) = payload.map_err(|e| {
        state.metrics.failed_dispatches.fetch_add(1, Ordering::Relaxed);
        ApiError::BadRequest(e.body_text())
    })?;

    tracing::info!(
        "Dispatching {} ({})",
        request.action,
        request.credentials.environment
    );

    let result = state.dispatcher.try_dispatch(&request).await.map_err(|e| {
        state.metrics.failed_dispatches.fetch_add(1, Ordering::Relaxed);
        tracing::error!("Dispatch error: {}", e);
        ApiError::from(e)
    })?;

    if !result.success {
        state.metrics.failed_dispatches.fetch_add(1, Ordering::Relaxed);
    }

    Ok(Json(result))
}

/// Action catalog for front ends
async fn list_actions() -> Json<Vec<ActionInfo>> {
    Json(
        Action::ALL
            .into_iter()
            .map(|action| ActionInfo {
                key: action.as_str(),
                label: action.label(),
                group: action.group(),
                method: action.method().to_string(),
                resource_param: action.resource().map(|r| r.param_name()),
                takes_body: action.takes_body(),
                sample_body: action.sample_body(),
            })
            .collect(),
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActionInfo {
    key: &'static str,
    label: &'static str,
    group: &'static str,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource_param: Option<&'static str>,
    takes_body: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_body: Option<Value>,
}

/// Get server metrics
async fn get_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        total_requests: state.metrics.total_requests.load(Ordering::Relaxed),
        requests_in_flight: state.metrics.requests_in_flight.load(Ordering::Relaxed),
        failed_dispatches: state.metrics.failed_dispatches.load(Ordering::Relaxed),
        uptime_seconds: state.metrics.start_time.elapsed().as_secs(),
    })
}

#[derive(Serialize)]
struct MetricsResponse {
    total_requests: u64,
    requests_in_flight: u64,
    failed_dispatches: u64,
    uptime_seconds: u64,
}

/// API error types
#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    InternalError(String),
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        if err.is_client_error() {
            ApiError::BadRequest(err.to_string())
        } else {
            ApiError::InternalError(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ApiResult::failure(message))).into_response()
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use tower::ServiceExt;

    fn app() -> Router {
        build_app(Arc::new(Dispatcher::new().unwrap()))
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_dispatch(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/dispatch")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_unknown_action_is_bad_request() {
        let response = app()
            .oneshot(post_dispatch(
                r#"{"clientId":"id","clientSecret":"secret","environment":"sandbox","action":"frobnicate","customBaseUrl":"http://127.0.0.1:9"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Unknown action: frobnicate");
    }

    #[tokio::test]
    async fn test_malformed_json_still_gets_json_error() {
        let response = app().oneshot(post_dispatch("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_action_catalog() {
        let response = app()
            .oneshot(Request::builder().uri("/api/actions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        let actions = body.as_array().unwrap();
        assert_eq!(actions.len(), 18);
        let update = actions
            .iter()
            .find(|a| a["key"] == "update_payment")
            .unwrap();
        assert_eq!(update["method"], "PATCH");
        assert_eq!(update["resourceParam"], "paymentId");
        assert!(update["sampleBody"].is_array());
        assert_eq!(update["takesBody"], true);
        let void = actions
            .iter()
            .find(|a| a["key"] == "void_authorization")
            .unwrap();
        assert_eq!(void["takesBody"], false);
    }
}
