//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;

use directories::ProjectDirs;

/// Default upstream product-data API
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://world.openfoodfacts.org/";

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL every catalog path is joined onto
    pub upstream_base_url: String,
    /// HTTP server port
    pub server_port: u16,
    /// Background sweep interval in seconds
    pub sweep_interval: u64,
    /// Root directory for the durable mirror, None = mirror disabled
    pub cache_dir: Option<PathBuf>,
    /// Names the mirror subdirectory; restarts with the same id restore entries
    pub session_id: String,
    /// Whether hit/miss instrumentation records anything
    pub instrumentation_enabled: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `UPSTREAM_BASE_URL` - Product API base URL (default: Open Food Facts)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWEEP_INTERVAL` - Expiry sweep frequency in seconds (default: 300)
    /// - `CACHE_DIR` - Mirror root directory (default: XDG cache dir)
    /// - `CACHE_SESSION` - Mirror session id (default: "default")
    /// - `MIRROR_ENABLED` - Set to `false` to keep the cache memory-only
    /// - `INSTRUMENTATION_ENABLED` - Defaults to on in debug builds only
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mirror_enabled = parse_bool(env::var("MIRROR_ENABLED").ok()).unwrap_or(true);
        let cache_dir = if mirror_enabled {
            env::var("CACHE_DIR")
                .ok()
                .map(PathBuf::from)
                .or(defaults.cache_dir)
        } else {
            None
        };

        Self {
            upstream_base_url: env::var("UPSTREAM_BASE_URL")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.upstream_base_url),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            sweep_interval: env::var("SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.sweep_interval),
            cache_dir,
            session_id: env::var("CACHE_SESSION")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.session_id),
            instrumentation_enabled: parse_bool(env::var("INSTRUMENTATION_ENABLED").ok())
                .unwrap_or(defaults.instrumentation_enabled),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream_base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            server_port: 3000,
            sweep_interval: 300,
            cache_dir: ProjectDirs::from("", "", "product_cache")
                .map(|dirs| dirs.cache_dir().to_path_buf()),
            session_id: "default".to_string(),
            instrumentation_enabled: cfg!(debug_assertions),
        }
    }
}

fn parse_bool(value: Option<String>) -> Option<bool> {
    match value?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
