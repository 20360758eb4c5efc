//! HTTP front end for campus route planning and live guidance sessions.

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    error_handling::HandleErrorLayer,
    http::StatusCode,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use config::ServerConfig;
pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_CONCURRENT_REQUESTS: usize = 256;

/// Builds the API router over a loaded campus
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/nodes", get(handlers::list_nodes))
        .route("/nodes/nearest", get(handlers::nearest_node))
        .route("/nodes/nearby", get(handlers::nearby_nodes))
        .route("/routes", post(handlers::plan_route))
        .route("/routes/geojson", post(handlers::plan_route_geojson))
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/{id}",
            get(handlers::session_status).delete(handlers::delete_session),
        )
        .route("/sessions/{id}/positions", post(handlers::push_position))
        .route("/sessions/{id}/events", get(handlers::drain_events))
        .route("/sessions/{id}/pause", post(handlers::pause_session))
        .route("/sessions/{id}/resume", post(handlers::resume_session))
        .with_state(state);

    api.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(HandleErrorLayer::new(|error: tower::BoxError| async move {
                if error.is::<tower::timeout::error::Elapsed>() {
                    (StatusCode::REQUEST_TIMEOUT, "request timed out".to_string())
                } else {
                    (StatusCode::SERVICE_UNAVAILABLE, format!("unavailable: {error}"))
                }
            }))
            .timeout(REQUEST_TIMEOUT)
            .concurrency_limit(MAX_CONCURRENT_REQUESTS)
            .layer(CorsLayer::permissive()),
    )
}
