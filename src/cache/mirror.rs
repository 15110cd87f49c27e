//! Durable Mirror Module
//!
//! Session-scoped persistence for cache entries. The mirror is a restart aid,
//! not a source of truth: the TTL store writes through to it, consults it on a
//! memory miss, and absorbs every error it returns.
//!
//! Mirror calls are synchronous and run while the caller holds the store's
//! write lock, so disk latency is paid inline on the async worker. Entries are
//! small JSON documents; a slow disk slows every store operation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::cache::CacheEntry;
use crate::error::MirrorError;

/// Reserved file-name prefix marking files owned by this cache.
pub const MIRROR_PREFIX: &str = "cache_";

const MIRROR_EXTENSION: &str = "json";

// == Durable Mirror Trait ==
/// Storage the TTL store mirrors its entries into.
pub trait DurableMirror: Send + Sync + std::fmt::Debug {
    /// Persists `entry` under `key`, replacing any previous entry.
    fn write(&self, key: &str, entry: &CacheEntry) -> Result<(), MirrorError>;

    /// Loads the entry for `key`. `Ok(None)` when nothing is stored.
    fn read(&self, key: &str) -> Result<Option<CacheEntry>, MirrorError>;

    /// Removes the entry for `key`. Removing a missing entry is not an error.
    fn remove(&self, key: &str) -> Result<(), MirrorError>;

    /// Removes every entry in this mirror's namespace.
    fn clear(&self) -> Result<(), MirrorError>;

    /// Every stored entry with its key, including ones memory never loaded.
    fn entries(&self) -> Result<Vec<(String, CacheEntry)>, MirrorError>;
}

/// On-disk body: the entry layout plus the key it was stored under.
#[derive(Serialize)]
struct RecordRef<'a> {
    key: &'a str,
    #[serde(flatten)]
    entry: &'a CacheEntry,
}

#[derive(Deserialize)]
struct Record {
    key: String,
    #[serde(flatten)]
    entry: CacheEntry,
}

// == Disk Mirror ==
/// Stores one JSON file per key in a session directory.
///
/// File names are the reserved prefix followed by the SHA-256 of the key, so
/// their length does not depend on the key. The key itself is kept in the
/// body and checked on read.
#[derive(Debug, Clone)]
pub struct DiskMirror {
    dir: PathBuf,
}

impl DiskMirror {
    /// Uses `dir` directly. Created lazily on first write.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Scopes the mirror to `root/session-<session_id>`.
    pub fn for_session(root: &Path, session_id: &str) -> Self {
        Self::with_dir(root.join(format!("session-{}", session_id)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let digest: String = hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect();
        self.dir
            .join(format!("{}{}.{}", MIRROR_PREFIX, digest, MIRROR_EXTENSION))
    }

    fn owns(path: &Path) -> bool {
        let has_prefix = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(MIRROR_PREFIX))
            .unwrap_or(false);
        let has_extension = path
            .extension()
            .map(|ext| ext == MIRROR_EXTENSION)
            .unwrap_or(false);
        has_prefix && has_extension
    }

    fn owned_files(&self) -> Result<Vec<PathBuf>, MirrorError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if Self::owns(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }
}

fn remove_if_present(path: &Path) -> Result<(), MirrorError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl DurableMirror for DiskMirror {
    fn write(&self, key: &str, entry: &CacheEntry) -> Result<(), MirrorError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_vec(&RecordRef { key, entry })?;
        fs::write(self.entry_path(key), json)?;
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<CacheEntry>, MirrorError> {
        let bytes = match fs::read(self.entry_path(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: Record = serde_json::from_slice(&bytes)?;
        Ok((record.key == key).then_some(record.entry))
    }

    fn remove(&self, key: &str) -> Result<(), MirrorError> {
        remove_if_present(&self.entry_path(key))
    }

    fn clear(&self) -> Result<(), MirrorError> {
        for path in self.owned_files()? {
            remove_if_present(&path)?;
        }
        Ok(())
    }

    /// Files that cannot be decoded are deleted, since no key can reach them.
    fn entries(&self) -> Result<Vec<(String, CacheEntry)>, MirrorError> {
        let mut records = Vec::new();
        for path in self.owned_files()? {
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            match serde_json::from_slice::<Record>(&bytes) {
                Ok(record) => records.push((record.key, record.entry)),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "removing undecodable mirror file");
                    remove_if_present(&path)?;
                }
            }
        }
        Ok(records)
    }
}

// == Null Mirror ==
/// Mirror that stores nothing. Used when persistence is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMirror;

impl DurableMirror for NullMirror {
    fn write(&self, _: &str, _: &CacheEntry) -> Result<(), MirrorError> {
        Ok(())
    }

    fn read(&self, _: &str) -> Result<Option<CacheEntry>, MirrorError> {
        Ok(None)
    }

    fn remove(&self, _: &str) -> Result<(), MirrorError> {
        Ok(())
    }

    fn clear(&self) -> Result<(), MirrorError> {
        Ok(())
    }

    fn entries(&self) -> Result<Vec<(String, CacheEntry)>, MirrorError> {
        Ok(Vec::new())
    }
}
