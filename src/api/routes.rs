//! API Routes
//!
//! Configures the Axum router with the product and cache management endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    categories_handler, clear_expired_handler, clear_handler, entry_handler, health_handler, home_handler,
    invalidate_handler, metrics_handler, metrics_reset_handler, product_handler, search_category_handler,
    search_name_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/home", get(home_handler))
        .route("/api/product", get(product_handler))
        .route("/api/search/name", get(search_name_handler))
        .route("/api/search/barcode", get(product_handler))
        .route("/api/search/category", get(search_category_handler))
        .route("/api/search/category-all", get(categories_handler))
        .route("/cache", delete(clear_handler))
        .route("/cache/stats", get(stats_handler))
        .route("/cache/entry", get(entry_handler))
        .route("/cache/clear-expired", post(clear_expired_handler))
        .route("/cache/invalidate", post(invalidate_handler))
        .route("/cache/metrics", get(metrics_handler))
        .route("/cache/metrics/reset", post(metrics_reset_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
