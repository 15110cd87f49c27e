//! Cache Entry Module
//!
//! Defines individual cache entries and the clock that ages them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// A single cached response with its freshness metadata.
///
/// The serialized form is also the durable mirror layout:
/// `{data, writtenAt, ttl, validator?}` with times in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The stored payload
    #[serde(rename = "data")]
    pub value: Value,
    /// Write timestamp (Unix milliseconds), set once
    pub written_at: u64,
    /// Lifetime in milliseconds
    pub ttl: u64,
    /// Opaque validator such as an ETag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry written at `now_ms`.
    pub fn new(value: Value, now_ms: u64, ttl: Duration, validator: Option<String>) -> Self {
        Self {
            value,
            written_at: now_ms,
            ttl: ttl.as_millis().min(u64::MAX as u128) as u64,
            validator,
        }
    }

    // == Is Expired ==
    /// An entry is live while `now - written_at <= ttl`.
    ///
    /// Boundary condition: at exactly `ttl` elapsed the entry is still live,
    /// one millisecond later it is expired. A `written_at` in the future
    /// (clock skew on restore) counts as zero age.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.age_ms(now_ms) > self.ttl
    }

    /// Milliseconds since the entry was written.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.written_at)
    }

    // == Time To Live ==
    /// Remaining lifetime in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.ttl.saturating_sub(self.age_ms(now_ms))
    }
}

// == Clock ==
/// Source of "now" for the store.
///
/// `Clock::system()` reads wall time; `Clock::manual()` only moves when told
/// to, which lets expiry be tested without sleeping.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    manual: Option<Arc<AtomicU64>>,
}

impl Clock {
    pub fn system() -> Self {
        Self { manual: None }
    }

    /// A clock frozen at `start_ms`.
    pub fn manual(start_ms: u64) -> Self {
        Self {
            manual: Some(Arc::new(AtomicU64::new(start_ms))),
        }
    }

    pub fn now_ms(&self) -> u64 {
        match &self.manual {
            Some(now) => now.load(Ordering::SeqCst),
            None => current_timestamp_ms(),
        }
    }

    /// Moves a manual clock forward. No effect on the system clock.
    pub fn advance(&self, by: Duration) {
        if let Some(now) = &self.manual {
            now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
