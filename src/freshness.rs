//! Freshness Resolver
//!
//! Turns upstream `Cache-Control` metadata into the TTL assigned to a cache
//! write. `s-maxage` wins over `max-age`; anything else falls back to the
//! caller's default.

use std::time::Duration;

/// A single parsed `Cache-Control` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheDirective {
    Public,
    Private,
    NoStore,
    NoCache,
    MaxAge(u64),
    SMaxAge(u64),
    /// Anything else, with its raw argument
    Other(String, Option<String>),
}

impl CacheDirective {
    /// Parses one comma-separated token. Returns `None` for empty tokens.
    ///
    /// A numeric directive with an unparseable argument is kept as
    /// [`CacheDirective::Other`] so it cannot influence freshness.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }

        let (name, arg) = match token.split_once('=') {
            Some((name, arg)) => (name.trim(), Some(arg.trim().trim_matches('"'))),
            None => (token, None),
        };
        let name = name.to_ascii_lowercase();

        let directive = match (name.as_str(), arg) {
            ("public", None) => CacheDirective::Public,
            ("private", None) => CacheDirective::Private,
            ("no-store", None) => CacheDirective::NoStore,
            ("no-cache", None) => CacheDirective::NoCache,
            ("max-age", Some(secs)) => match secs.parse() {
                Ok(secs) => CacheDirective::MaxAge(secs),
                Err(_) => CacheDirective::Other(name, Some(secs.to_string())),
            },
            ("s-maxage", Some(secs)) => match secs.parse() {
                Ok(secs) => CacheDirective::SMaxAge(secs),
                Err(_) => CacheDirective::Other(name, Some(secs.to_string())),
            },
            (_, arg) => CacheDirective::Other(name, arg.map(str::to_string)),
        };
        Some(directive)
    }
}

/// Parsed `Cache-Control` header value.
///
/// ```
/// use product_cache::freshness::CacheControl;
///
/// let cc = CacheControl::parse("public, s-maxage=900, stale-while-revalidate=1800");
/// assert_eq!(cc.s_maxage(), Some(900));
/// assert_eq!(cc.max_age(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    directives: Vec<CacheDirective>,
}

impl CacheControl {
    pub fn parse(header: &str) -> Self {
        Self {
            directives: header.split(',').filter_map(CacheDirective::parse).collect(),
        }
    }

    pub fn directives(&self) -> &[CacheDirective] {
        &self.directives
    }

    /// Private-cache lifetime in seconds (first occurrence).
    pub fn max_age(&self) -> Option<u64> {
        self.directives.iter().find_map(|d| match d {
            CacheDirective::MaxAge(secs) => Some(*secs),
            _ => None,
        })
    }

    /// Shared-cache lifetime in seconds (first occurrence).
    pub fn s_maxage(&self) -> Option<u64> {
        self.directives.iter().find_map(|d| match d {
            CacheDirective::SMaxAge(secs) => Some(*secs),
            _ => None,
        })
    }

    /// Shared hint first, then private hint.
    pub fn freshness_lifetime(&self) -> Option<Duration> {
        self.s_maxage()
            .or_else(|| self.max_age())
            .map(Duration::from_secs)
    }
}

/// TTL for a cache write given the response's `Cache-Control` value.
pub fn resolve_ttl(cache_control: Option<&str>, fallback: Duration) -> Duration {
    cache_control
        .map(CacheControl::parse)
        .and_then(|cc| cc.freshness_lifetime())
        .unwrap_or(fallback)
}
