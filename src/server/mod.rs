pub mod routes;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

/// API routes, static front-end fallback, and a permissive CORS layer so the
/// simulator can be called from another origin.
pub fn build_router(state: Arc<AppState>) -> Router {
    let frontend = state.config.frontend_dir.clone();

    Router::new()
        .route("/api/simulate", post(routes::simulate))
        .route("/api/health", get(routes::health))
        .route("/api/counters", get(routes::get_counters))
        .fallback_service(
            ServeDir::new(&frontend).fallback(ServeFile::new(frontend.join("index.html"))),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
