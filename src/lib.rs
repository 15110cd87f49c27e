//! Product Cache - A two-tier TTL response cache for a product-data API
//!
//! Answers repeated product queries from memory, mirrors entries to disk so a
//! restart keeps them, and derives freshness from upstream `Cache-Control`.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod freshness;
pub mod metrics;
pub mod models;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{ResponseCache, TtlStore, TtlTier};
pub use catalog::ProductCatalog;
pub use config::Config;
pub use error::{CacheError, Result};
pub use fetch::{CachedFetcher, FetchOptions, HttpUpstream, Upstream};
pub use metrics::Instrumentation;
