//! Cache Module
//!
//! Two-tier TTL caching: an in-memory map written through to a session-scoped
//! durable mirror, plus the key and tier conventions callers use.

mod entry;
mod key;
mod mirror;
mod response_cache;
mod stats;
mod store;
mod tier;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry, Clock};
pub use key::{derive_key, KEY_SEPARATOR};
pub use mirror::{DiskMirror, DurableMirror, NullMirror, MIRROR_PREFIX};
pub use response_cache::{ResponseCache, SharedStore};
pub use stats::StoreStats;
pub use store::TtlStore;
pub use tier::TtlTier;
