//! HTTP API gateway for slotboard.
//!
//! Exposes the board operations under `/v1/boards/{board}` plus a health
//! check. Request handlers translate JSON bodies into engine calls and
//! engine errors into status codes; see [`api_v1`].
//!
//! Built on Axum.

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, extract::State, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use slotboard_config::{AppConfig, GatewayConfig};
use slotboard_engine::Boards;

pub use api_v1::{ApiError, ApiV1State, SharedApiState};

/// Build the full router.
///
/// Layers applied:
/// - CORS limited to the configured origins
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedApiState, gateway: &GatewayConfig) -> Router {
    let origins: Vec<HeaderValue> = gateway
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server and run until Ctrl-C.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let kv = slotboard_store::build_from_config(&config.store).await?;
    let boards = Boards::new(kv, config.boards.clone());
    let state = Arc::new(ApiV1State::new(boards));
    let app = build_router(state, &config.gateway);

    info!(addr = %addr, backend = %config.store.backend, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    backend: String,
    uptime_secs: i64,
}

async fn health_handler(State(state): State<SharedApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.boards.backend_name().to_string(),
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use slotboard_config::BoardsConfig;
    use slotboard_store::InMemoryKv;
    use tower::ServiceExt;

    fn test_state() -> SharedApiState {
        let boards = Boards::new(Arc::new(InMemoryKv::new()), BoardsConfig::default());
        Arc::new(ApiV1State::new(boards))
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(test_state(), &GatewayConfig::default());

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["backend"], "memory");
    }

    #[tokio::test]
    async fn board_routes_are_nested_under_v1() {
        let app = build_router(test_state(), &GatewayConfig::default());

        let req = Request::builder()
            .uri("/v1/boards/daily/slots")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let app = build_router(test_state(), &GatewayConfig::default());

        let req = Request::builder()
            .uri("/health")
            .header("origin", "http://localhost:8080")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:8080"
        );
    }
}
