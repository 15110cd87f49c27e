//! Response Cache
//!
//! The single cache instance a process owns: store, instrumentation and the
//! sweep task, built by the composition root and shared by reference.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::cache::{DiskMirror, DurableMirror, NullMirror, StoreStats, TtlStore};
use crate::config::Config;
use crate::metrics::Instrumentation;
use crate::tasks::SweepTask;

/// Store shared between the fetch path, the sweep task and management calls.
pub type SharedStore = Arc<RwLock<TtlStore>>;

#[derive(Debug)]
pub struct ResponseCache {
    store: SharedStore,
    metrics: Arc<Instrumentation>,
    sweeper: Mutex<Option<SweepTask>>,
}

impl ResponseCache {
    // == Constructor ==
    pub fn new(store: TtlStore, metrics: Instrumentation) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            metrics: Arc::new(metrics),
            sweeper: Mutex::new(None),
        }
    }

    /// Builds the cache described by `config`. The sweep is not started.
    pub fn from_config(config: &Config) -> Self {
        let mirror: Box<dyn DurableMirror> = match &config.cache_dir {
            Some(root) => Box::new(DiskMirror::for_session(root, &config.session_id)),
            None => Box::new(NullMirror),
        };
        Self::new(
            TtlStore::with_mirror(mirror),
            Instrumentation::new(config.instrumentation_enabled),
        )
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<Instrumentation> {
        &self.metrics
    }

    // == Sweep Lifecycle ==
    /// Starts the periodic expiry sweep, replacing a running one.
    pub async fn start_sweeper(&self, interval: Duration) {
        let task = SweepTask::spawn(self.store.clone(), interval);
        if let Some(previous) = self.sweeper.lock().await.replace(task) {
            previous.shutdown().await;
        }
    }

    pub async fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .await
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    /// Stops the sweep and waits for it to exit. Entries, and their mirrored
    /// copies, are kept for the next start of the same session.
    pub async fn shutdown(&self) {
        if let Some(task) = self.sweeper.lock().await.take() {
            task.shutdown().await;
        }
    }

    /// Stops the sweep, waiting for it to exit, then clears every entry.
    pub async fn destroy(&self) {
        self.shutdown().await;
        self.store.write().await.clear();
        info!("Response cache destroyed");
    }

    // == Management ==
    /// Removes every key containing `pattern`.
    pub async fn invalidate_pattern(&self, pattern: &str) -> usize {
        if pattern.is_empty() {
            warn!("Ignoring invalidation with an empty pattern");
            return 0;
        }
        let removed = self.store.write().await.invalidate_pattern(pattern);
        info!(pattern, removed, "Invalidated cache entries");
        removed
    }

    pub async fn clear_all(&self) {
        self.store.write().await.clear();
        info!("Cache cleared");
    }

    pub async fn clear_expired(&self) -> usize {
        self.store.write().await.sweep_expired()
    }

    pub async fn stats(&self) -> StoreStats {
        self.store.read().await.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Clock;
    use serde_json::json;
    use tempfile::TempDir;

    fn manual_cache() -> (ResponseCache, Clock) {
        let clock = Clock::manual(0);
        let cache = ResponseCache::new(
            TtlStore::new().with_clock(clock.clone()),
            Instrumentation::new(true),
        );
        (cache, clock)
    }

    #[tokio::test]
    async fn test_clear_all_then_stats_is_empty() {
        let (cache, _) = manual_cache();
        {
            let mut store = cache.store().write().await;
            store.set("a", json!(1), Duration::from_secs(60), None);
            store.set("b", json!(2), Duration::from_secs(60), None);
        }

        cache.clear_all().await;

        assert_eq!(cache.stats().await.count, 0);
    }

    #[tokio::test]
    async fn test_invalidate_pattern() {
        let (cache, _) = manual_cache();
        {
            let mut store = cache.store().write().await;
            store.set("category:snacks:name:asc", json!(1), Duration::from_secs(60), None);
            store.set("categories:all", json!(2), Duration::from_secs(60), None);
            store.set("home_products:1", json!(3), Duration::from_secs(60), None);
        }

        assert_eq!(cache.invalidate_pattern("category").await, 2);
        assert_eq!(cache.stats().await.keys, vec!["home_products:1"]);
    }

    #[tokio::test]
    async fn test_empty_pattern_removes_nothing() {
        let (cache, _) = manual_cache();
        cache
            .store()
            .write()
            .await
            .set("a", json!(1), Duration::from_secs(60), None);

        assert_eq!(cache.invalidate_pattern("").await, 0);
        assert_eq!(cache.stats().await.count, 1);
    }

    #[tokio::test]
    async fn test_clear_expired() {
        let (cache, clock) = manual_cache();
        {
            let mut store = cache.store().write().await;
            store.set("old", json!(1), Duration::from_secs(1), None);
            store.set("new", json!(2), Duration::from_secs(60), None);
        }
        clock.advance(Duration::from_secs(5));

        assert_eq!(cache.clear_expired().await, 1);
        assert_eq!(cache.stats().await.keys, vec!["new"]);
    }

    #[tokio::test]
    async fn test_destroy_stops_sweeper_and_clears() {
        let (cache, _) = manual_cache();
        cache.start_sweeper(Duration::from_secs(60)).await;
        assert!(cache.is_sweeping().await);
        cache
            .store()
            .write()
            .await
            .set("a", json!(1), Duration::from_secs(60), None);

        cache.destroy().await;

        assert!(!cache.is_sweeping().await);
        assert_eq!(cache.stats().await.count, 0);
    }

    #[tokio::test]
    async fn test_shutdown_keeps_entries() {
        let (cache, _) = manual_cache();
        cache.start_sweeper(Duration::from_secs(60)).await;
        cache
            .store()
            .write()
            .await
            .set("a", json!(1), Duration::from_secs(60), None);

        cache.shutdown().await;

        assert!(!cache.is_sweeping().await);
        assert_eq!(cache.stats().await.keys, vec!["a"]);
    }

    #[tokio::test]
    async fn test_from_config_uses_session_mirror() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            cache_dir: Some(dir.path().to_path_buf()),
            session_id: "test".to_string(),
            ..Config::default()
        };

        ResponseCache::from_config(&config)
            .store()
            .write()
            .await
            .set("k", json!(1), Duration::from_secs(60), None);

        let restored = ResponseCache::from_config(&config);
        assert_eq!(restored.store().write().await.get("k"), Some(json!(1)));
        assert!(dir.path().join("session-test").exists());
    }
}
