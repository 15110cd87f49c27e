//! API Handlers
//!
//! Pass-through product routes served through the catalog, and the cache
//! management surface.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use tracing::info;

use crate::cache::{ResponseCache, StoreStats};
use crate::catalog::{CatalogQuery, Payload, ProductCatalog};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::fetch::{CachedFetcher, HttpUpstream, Upstream};
use crate::metrics::CacheMetrics;
use crate::models::{
    BarcodeParams, CategoryParams, ClearResponse, EntryParams, EntryResponse, HealthResponse, HomeParams,
    InvalidateRequest, InvalidateResponse, SearchNameParams,
};

/// Upstream as held by the router.
pub type SharedUpstream = Arc<dyn Upstream>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ResponseCache>,
    pub catalog: Arc<ProductCatalog<SharedUpstream>>,
}

impl AppState {
    pub fn new(cache: Arc<ResponseCache>, upstream: SharedUpstream) -> Self {
        let catalog = ProductCatalog::new(CachedFetcher::new(cache.clone(), upstream));
        Self {
            cache,
            catalog: Arc::new(catalog),
        }
    }

    /// Builds the cache and HTTP upstream described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("product_cache/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CacheError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        let upstream = HttpUpstream::with_base_url(&config.upstream_base_url)?.with_client(client);
        let cache = Arc::new(ResponseCache::from_config(config));
        Ok(Self::new(cache, Arc::new(upstream)))
    }

    async fn serve(&self, query: CatalogQuery) -> Result<Json<Payload>> {
        self.catalog.query(query).await.map(Json)
    }
}

// == Product Routes ==
/// Handler for GET /api/home
pub async fn home_handler(State(state): State<AppState>, Query(params): Query<HomeParams>) -> Result<Json<Payload>> {
    state.serve(params.into_query()).await
}

/// Handler for GET /api/product and GET /api/search/barcode
pub async fn product_handler(
    State(state): State<AppState>,
    Query(params): Query<BarcodeParams>,
) -> Result<Json<Payload>> {
    state.serve(params.into_query()?).await
}

/// Handler for GET /api/search/name
pub async fn search_name_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchNameParams>,
) -> Result<Json<Payload>> {
    state.serve(params.into_query()?).await
}

/// Handler for GET /api/search/category
pub async fn search_category_handler(
    State(state): State<AppState>,
    Query(params): Query<CategoryParams>,
) -> Result<Json<Payload>> {
    state.serve(params.into_query()?).await
}

/// Handler for GET /api/search/category-all
pub async fn categories_handler(State(state): State<AppState>) -> Result<Json<Payload>> {
    state.serve(CatalogQuery::Categories).await
}

// == Cache Management ==
/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StoreStats> {
    Json(state.cache.stats().await)
}

/// Handler for GET /cache/entry
pub async fn entry_handler(
    State(state): State<AppState>,
    Query(params): Query<EntryParams>,
) -> Result<Json<EntryResponse>> {
    let store = state.cache.store().read().await;
    let entry = store
        .peek(&params.key)
        .ok_or_else(|| CacheError::NotFound(params.key.clone()))?;
    Ok(Json(EntryResponse::new(params.key.clone(), entry, store.clock().now_ms())))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear_all().await;
    Json(ClearResponse::cleared())
}

/// Handler for POST /cache/clear-expired
pub async fn clear_expired_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.cache.clear_expired().await;
    info!(removed, "Cleared expired entries on request");
    Json(ClearResponse::expired(removed))
}

/// Handler for POST /cache/invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let removed = state.cache.invalidate_pattern(&req.pattern).await;
    Ok(Json(InvalidateResponse::new(req.pattern, removed)))
}

/// Handler for GET /cache/metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Json<CacheMetrics> {
    Json(state.cache.metrics().snapshot())
}

/// Handler for POST /cache/metrics/reset
pub async fn metrics_reset_handler(State(state): State<AppState>) -> Json<CacheMetrics> {
    state.cache.metrics().reset();
    Json(state.cache.metrics().snapshot())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
