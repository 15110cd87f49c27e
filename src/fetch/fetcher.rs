//! Fetch Orchestrator
//!
//! Cache-first fetch: look up the store, go upstream on a miss, resolve
//! freshness from the response, write back.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{derive_key, ResponseCache, TtlTier};
use crate::error::{CacheError, Result};
use crate::fetch::Upstream;
use crate::freshness::resolve_ttl;

/// Prefix of keys derived from an identifier.
pub const FETCH_KEY_PREFIX: &str = "fetch";

// == Abort Signal ==
/// Lets a caller abandon a fetch. Once aborted, the fetch will not write the
/// cache; an in-flight network call is not interrupted.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// == Fetch Options ==
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// TTL used when the response carries no lifetime hint
    pub ttl_override: Option<Duration>,
    /// Use this key instead of deriving one from the identifier
    pub explicit_key: Option<String>,
    /// Skip the lookup and always go upstream
    pub bypass: bool,
    /// Extra request headers; part of the derived key
    pub headers: BTreeMap<String, String>,
    pub abort: Option<AbortSignal>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: impl Into<Duration>) -> Self {
        self.ttl_override = Some(ttl.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.explicit_key = Some(key.into());
        self
    }

    pub fn bypass(mut self, bypass: bool) -> Self {
        self.bypass = bypass;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn abort_on(mut self, signal: AbortSignal) -> Self {
        self.abort = Some(signal);
        self
    }

    fn is_aborted(&self) -> bool {
        self.abort.as_ref().map(AbortSignal::is_aborted).unwrap_or(false)
    }
}

/// Key used for `identifier` when no explicit key is given.
///
/// The request headers are serialized as JSON (sorted, so stable) and form
/// the second parameter.
pub fn default_key(identifier: &str, headers: &BTreeMap<String, String>) -> String {
    let serialized = serde_json::to_string(headers).unwrap_or_else(|_| "{}".to_string());
    derive_key(FETCH_KEY_PREFIX, &[identifier, serialized.as_str()])
}

// == Cached Fetcher ==
/// Public entry point for cached reads against an [`Upstream`].
///
/// Concurrent misses on the same key are not coalesced: both go upstream and
/// the last write wins.
#[derive(Debug)]
pub struct CachedFetcher<U> {
    cache: Arc<ResponseCache>,
    upstream: U,
}

impl<U: Upstream> CachedFetcher<U> {
    pub fn new(cache: Arc<ResponseCache>, upstream: U) -> Self {
        Self { cache, upstream }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    // == Fetch ==
    /// Returns the cached value for `identifier`, fetching it on a miss.
    ///
    /// A non-success upstream status fails the call and leaves the cache
    /// unchanged for the key. No timeout is applied here.
    pub async fn fetch(&self, identifier: &str, options: FetchOptions) -> Result<Value> {
        self.fetch_checked(identifier, options, |value| Ok(value.clone()))
            .await
    }

    /// [`fetch`](Self::fetch) decoded into `T`.
    ///
    /// A fresh response that does not decode is an error and is not cached.
    pub async fn fetch_as<T: DeserializeOwned>(&self, identifier: &str, options: FetchOptions) -> Result<T> {
        self.fetch_checked(identifier, options, |value| decode(identifier, value))
            .await
    }

    /// Shared fetch path. `check` runs on cached and fresh values alike; a
    /// fresh value is written back only once it passes.
    async fn fetch_checked<T, F>(&self, identifier: &str, options: FetchOptions, check: F) -> Result<T>
    where
        F: Fn(&Value) -> Result<T>,
    {
        let started = Instant::now();
        let key = options
            .explicit_key
            .clone()
            .unwrap_or_else(|| default_key(identifier, &options.headers));

        if !options.bypass {
            let cached = self.cache.store().write().await.get(&key);
            if let Some(value) = cached {
                match check(&value) {
                    Ok(checked) => {
                        self.cache.metrics().record_hit(identifier, started.elapsed());
                        return Ok(checked);
                    }
                    Err(e) => debug!(identifier, error = %e, "cached value rejected, refetching"),
                }
            }
        }

        if options.is_aborted() {
            return Err(CacheError::Aborted(identifier.to_string()));
        }

        let response = self.upstream.get(identifier, &options.headers).await?;
        if !response.is_success() {
            warn!(identifier, status = response.status, "upstream request failed");
            return Err(CacheError::Upstream {
                status: response.status,
                url: identifier.to_string(),
            });
        }

        let value = response.json(identifier)?;
        let checked = check(&value)?;
        self.cache.metrics().record_miss(identifier, started.elapsed());

        let fallback = options.ttl_override.unwrap_or_else(|| TtlTier::default().duration());
        let ttl = resolve_ttl(response.cache_control.as_deref(), fallback);

        if options.is_aborted() {
            debug!(identifier, "fetch aborted before write-back");
            return Err(CacheError::Aborted(identifier.to_string()));
        }

        self.cache
            .store()
            .write()
            .await
            .set(key, value, ttl, response.etag);

        Ok(checked)
    }

    // == Revalidate ==
    /// Always goes upstream and writes the fresh result back.
    pub async fn revalidate(&self, identifier: &str, options: FetchOptions) -> Result<Value> {
        self.fetch(identifier, options.bypass(true)).await
    }

    // == Prefetch ==
    /// Warms the cache. Errors are logged and discarded.
    pub async fn prefetch(&self, identifier: &str, options: FetchOptions) {
        if let Err(e) = self.fetch(identifier, options).await {
            warn!(identifier, error = %e, "prefetch failed");
        }
    }

    /// Drops the entry cached for `identifier` under its default key.
    pub async fn clear_url(&self, identifier: &str) -> bool {
        let key = default_key(identifier, &BTreeMap::new());
        self.cache.store().write().await.delete(&key)
    }
}

fn decode<T: DeserializeOwned>(identifier: &str, value: &Value) -> Result<T> {
    T::deserialize(value).map_err(|source| CacheError::Decode {
        url: identifier.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Clock, TtlStore};
    use crate::fetch::UpstreamResponse;
    use crate::metrics::Instrumentation;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    /// Upstream that replays scripted responses and counts calls.
    #[derive(Debug, Default)]
    struct ScriptedUpstream {
        responses: Mutex<Vec<UpstreamResponse>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedUpstream {
        fn new(responses: Vec<UpstreamResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Upstream for ScriptedUpstream {
        async fn get(&self, identifier: &str, _: &BTreeMap<String, String>) -> Result<UpstreamResponse> {
            self.calls.lock().unwrap().push(identifier.to_string());
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop()
                .expect("unexpected upstream call"))
        }
    }

    fn fetcher(responses: Vec<UpstreamResponse>) -> (CachedFetcher<Arc<ScriptedUpstream>>, Arc<ScriptedUpstream>, Clock) {
        let clock = Clock::manual(0);
        let cache = Arc::new(ResponseCache::new(
            TtlStore::new().with_clock(clock.clone()),
            Instrumentation::new(true),
        ));
        let upstream = Arc::new(ScriptedUpstream::new(responses));
        (CachedFetcher::new(cache, upstream.clone()), upstream, clock)
    }

    fn page(n: u32) -> Value {
        json!({"page": n, "products": [{"code": format!("{}", n)}]})
    }

    #[tokio::test]
    async fn test_cold_fetch_calls_upstream_once_and_caches() {
        let (fetcher, upstream, _) = fetcher(vec![UpstreamResponse::ok_json(&page(1))]);

        let value = assert_ok!(fetcher.fetch("products.json?page=1", FetchOptions::new()).await);

        assert_eq!(value, page(1));
        assert_eq!(upstream.calls(), 1);
        let key = default_key("products.json?page=1", &BTreeMap::new());
        let store = fetcher.cache().store().read().await;
        let entry = store.peek(&key).expect("entry written");
        assert_eq!(entry.ttl, TtlTier::Medium.duration().as_millis() as u64);
    }

    #[tokio::test]
    async fn test_warm_fetch_skips_upstream() {
        let (fetcher, upstream, _) = fetcher(vec![UpstreamResponse::ok_json(&page(1))]);

        fetcher.fetch("products.json?page=1", FetchOptions::new()).await.unwrap();
        let second = fetcher.fetch("products.json?page=1", FetchOptions::new()).await.unwrap();

        assert_eq!(second, page(1));
        assert_eq!(upstream.calls(), 1);
        let metrics = fetcher.cache().metrics().snapshot();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
    }

    #[tokio::test]
    async fn test_shared_max_age_sets_ttl() {
        let response = UpstreamResponse::ok_json(&page(1)).with_cache_control("public, s-maxage=300");
        let (fetcher, _, _) = fetcher(vec![response]);

        fetcher
            .fetch("x", FetchOptions::new().key("k").ttl(TtlTier::VeryLong))
            .await
            .unwrap();

        let store = fetcher.cache().store().read().await;
        assert_eq!(store.peek("k").unwrap().ttl, 300_000);
    }

    #[tokio::test]
    async fn test_ttl_override_used_without_hint() {
        let (fetcher, _, clock) = fetcher(vec![UpstreamResponse::ok_json(&page(1))]);

        fetcher
            .fetch("x", FetchOptions::new().key("k").ttl(TtlTier::Short))
            .await
            .unwrap();

        clock.advance(TtlTier::Short.duration() + Duration::from_millis(1));
        assert!(fetcher.cache().store().write().await.get("k").is_none());
    }

    #[tokio::test]
    async fn test_etag_captured_as_validator() {
        let response = UpstreamResponse::ok_json(&page(1)).with_etag("\"abc123\"");
        let (fetcher, _, _) = fetcher(vec![response]);

        fetcher.fetch("x", FetchOptions::new().key("k")).await.unwrap();

        let store = fetcher.cache().store().read().await;
        assert_eq!(store.peek("k").unwrap().validator.as_deref(), Some("\"abc123\""));
    }

    #[tokio::test]
    async fn test_error_status_propagates_and_leaves_cache() {
        let mut failing = UpstreamResponse::ok_json(&json!({"error": "down"}));
        failing.status = 503;
        let (fetcher, _, _) = fetcher(vec![failing]);

        let err = assert_err!(fetcher.fetch("x", FetchOptions::new().key("k")).await);

        assert!(matches!(err, CacheError::Upstream { status: 503, .. }));
        assert_eq!(fetcher.cache().stats().await.count, 0);
        assert_eq!(fetcher.cache().metrics().snapshot().misses, 0);
    }

    #[tokio::test]
    async fn test_error_keeps_previous_entry() {
        let mut failing = UpstreamResponse::ok_json(&json!({}));
        failing.status = 500;
        let (fetcher, _, _) = fetcher(vec![UpstreamResponse::ok_json(&page(1)), failing]);

        fetcher.fetch("x", FetchOptions::new().key("k")).await.unwrap();
        assert!(fetcher.revalidate("x", FetchOptions::new().key("k")).await.is_err());

        assert_eq!(fetcher.cache().store().write().await.get("k"), Some(page(1)));
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let response = UpstreamResponse {
            status: 200,
            cache_control: None,
            etag: None,
            body: b"not json".to_vec(),
        };
        let (fetcher, _, _) = fetcher(vec![response]);

        let err = fetcher.fetch("x", FetchOptions::new()).await.unwrap_err();
        assert!(matches!(err, CacheError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_revalidate_always_hits_upstream() {
        let (fetcher, upstream, _) = fetcher(vec![
            UpstreamResponse::ok_json(&page(1)),
            UpstreamResponse::ok_json(&page(2)),
        ]);

        fetcher.fetch("x", FetchOptions::new().key("k")).await.unwrap();
        let fresh = fetcher.revalidate("x", FetchOptions::new().key("k")).await.unwrap();

        assert_eq!(fresh, page(2));
        assert_eq!(upstream.calls(), 2);
        assert_eq!(fetcher.cache().store().write().await.get("k"), Some(page(2)));
    }

    #[tokio::test]
    async fn test_prefetch_warms_and_swallows_errors() {
        let mut failing = UpstreamResponse::ok_json(&json!({}));
        failing.status = 404;
        let (fetcher, upstream, _) = fetcher(vec![UpstreamResponse::ok_json(&page(1)), failing]);

        fetcher.prefetch("a", FetchOptions::new().key("a")).await;
        fetcher.prefetch("b", FetchOptions::new().key("b")).await;

        assert_eq!(upstream.calls(), 2);
        assert_eq!(fetcher.cache().stats().await.keys, vec!["a"]);
    }

    #[tokio::test]
    async fn test_aborted_fetch_does_not_write() {
        let (fetcher, upstream, _) = fetcher(vec![]);
        let signal = AbortSignal::new();
        signal.abort();

        let err = fetcher
            .fetch("x", FetchOptions::new().key("k").abort_on(signal))
            .await
            .unwrap_err();

        assert!(matches!(err, CacheError::Aborted(_)));
        assert_eq!(upstream.calls(), 0);
        assert_eq!(fetcher.cache().stats().await.count, 0);
    }

    /// Upstream that answers normally but aborts the caller's signal while
    /// the request is in flight.
    #[derive(Debug)]
    struct AbortingUpstream {
        signal: AbortSignal,
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl Upstream for AbortingUpstream {
        async fn get(&self, _: &str, _: &BTreeMap<String, String>) -> Result<UpstreamResponse> {
            *self.calls.lock().unwrap() += 1;
            self.signal.abort();
            Ok(UpstreamResponse::ok_json(&page(1)))
        }
    }

    #[tokio::test]
    async fn test_abort_during_request_skips_write_back() {
        let signal = AbortSignal::new();
        let cache = Arc::new(ResponseCache::new(TtlStore::new(), Instrumentation::new(true)));
        let fetcher = CachedFetcher::new(
            cache,
            AbortingUpstream {
                signal: signal.clone(),
                calls: Mutex::new(0),
            },
        );

        let err = assert_err!(
            fetcher
                .fetch("x", FetchOptions::new().key("k").abort_on(signal))
                .await
        );

        assert!(matches!(err, CacheError::Aborted(_)));
        assert_eq!(*fetcher.upstream.calls.lock().unwrap(), 1);
        assert_eq!(fetcher.cache().stats().await.count, 0);
    }

    #[tokio::test]
    async fn test_fetch_as_mismatch_is_not_cached() {
        #[derive(Debug, serde::Deserialize)]
        struct Page {
            #[allow(dead_code)]
            page: u32,
        }
        let (fetcher, upstream, _) = fetcher(vec![
            UpstreamResponse::ok_json(&json!({"page": "first"})),
            UpstreamResponse::ok_json(&page(3)),
        ]);

        let err = fetcher.fetch_as::<Page>("x", FetchOptions::new().key("k")).await.unwrap_err();
        assert!(matches!(err, CacheError::Decode { .. }));
        assert_eq!(fetcher.cache().stats().await.count, 0);
        assert_eq!(fetcher.cache().metrics().snapshot().misses, 0);

        let typed = fetcher.fetch_as::<Page>("x", FetchOptions::new().key("k")).await;
        assert_ok!(typed);
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test]
    async fn test_cached_value_that_fails_decode_is_refetched() {
        #[derive(Debug, serde::Deserialize)]
        struct Page {
            page: u32,
        }
        let (fetcher, upstream, _) = fetcher(vec![UpstreamResponse::ok_json(&page(4))]);
        fetcher
            .cache()
            .store()
            .write()
            .await
            .set("k", json!({"page": "stale"}), Duration::from_secs(60), None);

        let typed: Page = fetcher.fetch_as("x", FetchOptions::new().key("k")).await.unwrap();

        assert_eq!(typed.page, 4);
        assert_eq!(upstream.calls(), 1);
        assert_eq!(fetcher.cache().store().write().await.get("k"), Some(page(4)));
    }

    #[tokio::test]
    async fn test_headers_are_part_of_the_key() {
        let (fetcher, upstream, _) = fetcher(vec![
            UpstreamResponse::ok_json(&page(1)),
            UpstreamResponse::ok_json(&page(2)),
        ]);

        fetcher.fetch("x", FetchOptions::new()).await.unwrap();
        let other = fetcher
            .fetch("x", FetchOptions::new().header("accept-language", "fr"))
            .await
            .unwrap();

        assert_eq!(other, page(2));
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test]
    async fn test_clear_url() {
        let (fetcher, _, _) = fetcher(vec![UpstreamResponse::ok_json(&page(1))]);
        fetcher.fetch("x", FetchOptions::new()).await.unwrap();

        assert!(fetcher.clear_url("x").await);
        assert_eq!(fetcher.cache().stats().await.count, 0);
    }

    #[tokio::test]
    async fn test_fetch_as_typed() {
        #[derive(serde::Deserialize)]
        struct Page {
            page: u32,
        }
        let (fetcher, _, _) = fetcher(vec![UpstreamResponse::ok_json(&page(7))]);

        let typed: Page = fetcher.fetch_as("x", FetchOptions::new()).await.unwrap();
        assert_eq!(typed.page, 7);
    }

    #[test]
    fn test_default_key_shape() {
        assert_eq!(default_key("products.json?page=1", &BTreeMap::new()), "fetch:products.json?page=1:{}");
    }
}
