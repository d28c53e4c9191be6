//! API route definitions

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, ApiState};

/// Webhook targets for sensors, the wall button and the dimmer's status
/// notifications, plus the root-level health check.
pub fn signal_routes(state: ApiState) -> Router {
    Router::new()
        .route("/motion", get(handlers::motion))
        .route("/motion_end", get(handlers::motion_end))
        .route("/button", get(handlers::button))
        .route("/status", post(handlers::status))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Read-only controller views under `/api/v1`.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/state", get(handlers::get_state))
        .route("/config", get(handlers::get_config))
        .route("/scene", get(handlers::get_scene))
        .with_state(state)
}
