pub mod routes;

use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

/// HTTP surface over the pricing engine.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/price", get(routes::get_price))
        .route("/api/paths", get(routes::get_paths))
        .route("/api/counters", get(routes::get_counters))
        .route("/api/health", get(routes::get_health))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(state)
}
