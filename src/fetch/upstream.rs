//! Upstream Source
//!
//! The opaque HTTP data source the cache sits in front of.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderName, ACCEPT, CACHE_CONTROL, CONTENT_TYPE, ETAG};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::error::{CacheError, Result};

/// What the cache needs from an upstream response.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    /// Raw `Cache-Control` header value
    pub cache_control: Option<String>,
    /// Raw `ETag` header value
    pub etag: Option<String>,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    /// A 200 response carrying `body` as JSON and no cache headers.
    pub fn ok_json(body: &Value) -> Self {
        Self {
            status: 200,
            cache_control: None,
            etag: None,
            body: body.to_string().into_bytes(),
        }
    }

    pub fn with_cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    pub fn with_etag(mut self, value: impl Into<String>) -> Self {
        self.etag = Some(value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body as JSON.
    pub fn json(&self, url: &str) -> Result<Value> {
        serde_json::from_slice(&self.body).map_err(|source| CacheError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

// == Upstream Trait ==
/// A source of JSON responses. Implementations must be side-effect free for
/// reads, since concurrent misses on one key may call it twice.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Issues a `GET` for `identifier` with extra request `headers`.
    ///
    /// Only transport failures are errors here; a non-success status is a
    /// normal response that the caller inspects.
    async fn get(&self, identifier: &str, headers: &BTreeMap<String, String>) -> Result<UpstreamResponse>;
}

#[async_trait]
impl<U: Upstream + ?Sized> Upstream for Arc<U> {
    async fn get(&self, identifier: &str, headers: &BTreeMap<String, String>) -> Result<UpstreamResponse> {
        (**self).get(identifier, headers).await
    }
}

// == HTTP Upstream ==
/// reqwest-backed upstream. Relative identifiers are joined onto `base_url`.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
    base_url: Option<Url>,
}

impl Default for HttpUpstream {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpUpstream {
    /// Upstream that only accepts absolute identifiers.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: None,
        }
    }

    /// Upstream rooted at `base_url`.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| CacheError::InvalidRequest(format!("Invalid base URL '{}': {}", base_url, e)))?;
        Ok(Self {
            client: Client::new(),
            base_url: Some(base),
        })
    }

    /// Replaces the HTTP client, e.g. to set timeouts or a proxy.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Absolute URL for `identifier`.
    pub fn resolve(&self, identifier: &str) -> Result<Url> {
        match Url::parse(identifier) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.base_url.as_ref().ok_or_else(|| {
                    CacheError::InvalidRequest(format!("Relative URL '{}' without a base URL", identifier))
                })?;
                base.join(identifier.trim_start_matches('/')).map_err(|e| {
                    CacheError::InvalidRequest(format!("Cannot join '{}' onto base: {}", identifier, e))
                })
            }
            Err(e) => Err(CacheError::InvalidRequest(format!("Invalid URL '{}': {}", identifier, e))),
        }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn get(&self, identifier: &str, headers: &BTreeMap<String, String>) -> Result<UpstreamResponse> {
        let url = self.resolve(identifier)?;
        let transport = |source| CacheError::Transport {
            url: url.to_string(),
            source,
        };

        let mut request = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(transport)?;

        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let status = response.status().as_u16();
        let cache_control = header(CACHE_CONTROL);
        let etag = header(ETAG);
        let body = response.bytes().await.map_err(transport)?.to_vec();

        Ok(UpstreamResponse {
            status,
            cache_control,
            etag,
            body,
        })
    }
}
