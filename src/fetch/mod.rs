//! Fetch Module
//!
//! Cache-first access to an upstream JSON source.

mod fetcher;
mod upstream;

pub use fetcher::{default_key, AbortSignal, CachedFetcher, FetchOptions, FETCH_KEY_PREFIX};
pub use upstream::{HttpUpstream, Upstream, UpstreamResponse};
