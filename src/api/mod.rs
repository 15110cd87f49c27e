//! API Module
//!
//! HTTP handlers and routing for the product cache server.
//!
//! # Endpoints
//! - `GET /api/home`, `/api/product`, `/api/search/{name,barcode,category,category-all}` -
//!   product data served through the cache
//! - `GET /cache/stats`, `GET /cache/entry`, `DELETE /cache`, `POST /cache/clear-expired`,
//!   `POST /cache/invalidate` - cache management
//! - `GET /cache/metrics`, `POST /cache/metrics/reset` - hit/miss instrumentation
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
