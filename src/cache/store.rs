//! TTL Store Module
//!
//! In-memory map of cache entries with lazy and swept expiry, written through
//! to an optional durable mirror.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, Clock, DurableMirror, NullMirror, StoreStats};
use crate::error::MirrorError;

// == TTL Store ==
/// Two-tier TTL store: memory is authoritative, the mirror is consulted only
/// when memory misses.
pub struct TtlStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Session-scoped persistence
    mirror: Box<dyn DurableMirror>,
    /// Time source for stamping and expiry
    clock: Clock,
}

impl fmt::Debug for TtlStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlStore")
            .field("entries", &self.entries.len())
            .field("mirror", &self.mirror)
            .finish()
    }
}

impl Default for TtlStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TtlStore {
    // == Constructor ==
    /// Memory-only store on the system clock.
    pub fn new() -> Self {
        Self::with_mirror(Box::new(NullMirror))
    }

    /// Store mirrored into `mirror`.
    pub fn with_mirror(mirror: Box<dyn DurableMirror>) -> Self {
        Self {
            entries: HashMap::new(),
            mirror,
            clock: Clock::system(),
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry whole.
    ///
    /// The mirror write is best-effort; its failure leaves the in-memory
    /// entry in place.
    pub fn set(&mut self, key: impl Into<String>, value: Value, ttl: Duration, validator: Option<String>) {
        let key = key.into();
        let entry = CacheEntry::new(value, self.clock.now_ms(), ttl, validator);

        absorb("write", &key, self.mirror.write(&key, &entry));
        self.entries.insert(key, entry);
    }

    // == Get ==
    /// Returns the live value for `key`.
    ///
    /// On a memory miss the mirror is consulted and a live entry found there
    /// is restored into memory. Expired entries are removed from both tiers.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let now = self.clock.now_ms();

        if !self.entries.contains_key(key) {
            let restored = self.restore(key)?;
            self.entries.insert(key.to_string(), restored);
        }

        let expired = self.entries.get(key).map(|entry| entry.is_expired(now))?;
        if expired {
            self.remove_everywhere(key);
            return None;
        }

        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Has ==
    /// True when `get(key)` would return a value.
    pub fn has(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    // == Peek ==
    /// Live entry metadata without touching the mirror or reaping.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry> {
        let now = self.clock.now_ms();
        self.entries.get(key).filter(|entry| !entry.is_expired(now))
    }

    // == Delete ==
    /// Removes `key` from memory and mirror. Returns whether memory held it.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_everywhere(key)
    }

    // == Clear ==
    /// Removes every entry from memory and every mirrored entry in this
    /// cache's namespace.
    pub fn clear(&mut self) {
        self.entries.clear();
        absorb("clear", "*", self.mirror.clear());
    }

    // == Invalidate Pattern ==
    /// Removes every key containing `pattern`, in memory and in the mirror.
    /// Returns the number of distinct keys removed.
    pub fn invalidate_pattern(&mut self, pattern: &str) -> usize {
        let mut matching: BTreeSet<String> = self
            .entries
            .keys()
            .filter(|key| key.contains(pattern))
            .cloned()
            .collect();
        matching.extend(
            self.mirrored()
                .into_iter()
                .map(|(key, _)| key)
                .filter(|key| key.contains(pattern)),
        );

        for key in &matching {
            self.remove_everywhere(key);
        }
        matching.len()
    }

    // == Sweep Expired ==
    /// Removes all expired entries, including mirror-only ones left by an
    /// earlier run. Returns the number of distinct keys removed.
    pub fn sweep_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut expired_keys: BTreeSet<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for (key, entry) in self.mirrored() {
            // Memory is authoritative for keys it holds.
            if !self.entries.contains_key(&key) && entry.is_expired(now) {
                expired_keys.insert(key);
            }
        }

        for key in &expired_keys {
            self.remove_everywhere(key);
        }
        expired_keys.len()
    }

    // == Stats ==
    /// Snapshot of the keys currently held in memory.
    pub fn stats(&self) -> StoreStats {
        StoreStats::from_keys(self.entries.keys())
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn restore(&self, key: &str) -> Option<CacheEntry> {
        match self.mirror.read(key) {
            Ok(Some(entry)) => {
                debug!(key, "restored entry from mirror");
                Some(entry)
            }
            Ok(None) => None,
            Err(e) => {
                debug!(key, error = %e, "unreadable mirror entry treated as miss");
                absorb("remove", key, self.mirror.remove(key));
                None
            }
        }
    }

    fn mirrored(&self) -> Vec<(String, CacheEntry)> {
        self.mirror.entries().unwrap_or_else(|e| {
            warn!(error = %e, "mirror listing failed, continuing with memory only");
            Vec::new()
        })
    }

    fn remove_everywhere(&mut self, key: &str) -> bool {
        absorb("remove", key, self.mirror.remove(key));
        self.entries.remove(key).is_some()
    }
}

/// Logs and discards a mirror failure. Memory stays authoritative.
fn absorb(op: &str, key: &str, result: Result<(), MirrorError>) {
    if let Err(e) = result {
        warn!(op, key, error = %e, "mirror operation failed, continuing in memory");
    }
}
