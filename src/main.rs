//! Product Cache - A two-tier TTL response cache for a product-data API
//!
//! Serves the product routes through the cache and exposes cache management
//! endpoints.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use product_cache::{create_router, AppState, Config};

/// Main entry point for the product cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache (restoring the mirror session) and HTTP upstream
/// 4. Start the background expiry sweep
/// 5. Serve until SIGINT/SIGTERM, then stop the sweep and report metrics
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "product_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Product Cache Server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: upstream={}, port={}, sweep_interval={}s, cache_dir={:?}, session={}",
        config.upstream_base_url, config.server_port, config.sweep_interval, config.cache_dir, config.session_id
    );

    let state = AppState::from_config(&config).context("Failed to build upstream client")?;
    let cache = state.cache.clone();
    match &config.cache_dir {
        Some(dir) => info!(
            "Cache initialized, mirrored entries under {:?} load on first read",
            dir.join(format!("session-{}", config.session_id))
        ),
        None => info!("Cache initialized in memory only"),
    }

    cache
        .start_sweeper(Duration::from_secs(config.sweep_interval))
        .await;
    info!("Background sweep task started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    cache.metrics().report();
    cache.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
