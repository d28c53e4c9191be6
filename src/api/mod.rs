//! HTTP surface using Axum
//!
//! - `/motion`, `/motion_end`, `/button`, `/status`: inbound signals, queued
//!   for the event loop
//! - `/health`: liveness
//! - `/api/v1/state`, `/api/v1/config`, `/api/v1/scene`: read-only views

pub mod handlers;
mod routes;

pub use handlers::ApiState;

use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Same-origin only unless `CORRIDOR_CORS_ORIGINS` lists allowed origins
/// (comma-separated).
fn build_cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    match std::env::var("CORRIDOR_CORS_ORIGINS") {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        Err(_) => base,
    }
}

/// Complete application router.
pub fn create_app(state: ApiState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(routes::signal_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}
