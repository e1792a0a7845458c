//! API Route Configuration

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{self, AppState};
use super::middleware::{logging_middleware, rate_limit_middleware};

/// Create the API router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health & Status
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats))
        // Readings
        .route("/submit", post(handlers::submit_reading))
        .route("/latest", get(handlers::get_latest))
        .route("/history", get(handlers::get_history))
        // Stateless classification
        .route("/classify", post(handlers::classify_reading))
        .route("/classify/batch", post(handlers::batch_classify))
        // Reporting
        .route("/report", post(handlers::send_report));

    Router::new()
        .nest("/v1", api_v1)
        .route("/health", get(handlers::health_check))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
        // Outer layers (last added runs first)
        .layer(middleware::from_fn(logging_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
}
