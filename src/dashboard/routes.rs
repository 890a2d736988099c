//! Route configuration for the dashboard.

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};

/// Create the full router with all dashboard routes.
pub fn create_router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .nest("/api", api_routes())
        .with_state(state)
}

/// Create the `/api` router.
fn api_routes() -> Router<DashboardState> {
    Router::new()
        // Polling
        .route("/stats", get(stats_handler))
        .route("/log", get(log_handler))
        .route("/export", get(export_handler))
        // Commands
        .route("/start", post(start_handler))
        .route("/stop", post(stop_handler))
        .route("/clear", post(clear_handler))
        .route("/speed", post(speed_handler))
}
