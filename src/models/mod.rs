//! Request and Response models for the product cache API
//!
//! DTOs used for serializing/deserializing HTTP query strings and bodies.

pub mod requests;
pub mod responses;

pub use requests::{BarcodeParams, CategoryParams, EntryParams, HomeParams, InvalidateRequest, SearchNameParams};
pub use responses::{ClearResponse, EntryResponse, ErrorResponse, HealthResponse, InvalidateResponse};
