//! Store Statistics Module
//!
//! Point-in-time snapshot of what the TTL store holds.

use serde::Serialize;

// == Store Stats ==
/// Snapshot of the store contents. Detached from the store once taken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Number of entries held in memory (live or not yet swept)
    pub count: usize,
    /// Keys of those entries, sorted
    pub keys: Vec<String>,
}

impl StoreStats {
    // == Constructor ==
    /// Builds a snapshot from an iterator of keys.
    pub fn from_keys<'a>(keys: impl Iterator<Item = &'a String>) -> Self {
        let mut keys: Vec<String> = keys.cloned().collect();
        keys.sort_unstable();
        Self {
            count: keys.len(),
            keys,
        }
    }
}
