use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use tagwatch::allowlist::AllowListStore;
use tagwatch::cache::{build_redis_pool, RedisReleaseCache};
use tagwatch::config;
use tagwatch::http::{handler, AppState};
use tagwatch::metrics::MetricsRegistry;
use tagwatch::resolver::Resolver;
use tagwatch::store::pocketbase::PocketBaseStore;
use tagwatch::store::RecordStore;
use tagwatch::upstream::github::GitHubReleaseSource;
use tagwatch::upstream::rate_limit::RateLimitState;
use tagwatch::upstream::ReleaseSource;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "tagwatch", about = "Release-tracking proxy for curated GitHub repositories")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "/etc/tagwatch/config.yaml")]
    config: String,
}

// ---------------------------------------------------------------------------
// HTTP server
// ---------------------------------------------------------------------------

async fn run_http_server(state: AppState) -> Result<()> {
    let listen_addr: std::net::SocketAddr = state
        .config
        .server
        .http_listen
        .parse()
        .context("invalid http_listen address")?;

    let app = handler::create_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {listen_addr}"))?;

    tracing::info!(%listen_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Graceful shutdown
// ---------------------------------------------------------------------------

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // ---- CLI ----
    let cli = Cli::parse();

    // ---- Config ----
    let config = config::load_config(&cli.config)?;
    let config = Arc::new(config);

    // ---- Tracing ----
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(config_path = %cli.config, "starting tagwatch");

    // ---- Upstream credential ----
    // Absence is a fatal configuration error at process start, never a
    // per-request failure.
    let token = std::env::var(&config.upstream.token_env).with_context(|| {
        format!(
            "GitHub token not configured (expected in ${})",
            config.upstream.token_env
        )
    })?;
    anyhow::ensure!(
        !token.is_empty(),
        "GitHub token in ${} is empty",
        config.upstream.token_env
    );

    // ---- Infrastructure clients ----
    let http_client = reqwest::Client::builder()
        .user_agent("tagwatch/0.1")
        .build()
        .context("failed to build reqwest client")?;

    // A failed Redis connection degrades to an uncached service instead of
    // refusing to start.
    let redis = match build_redis_pool(&config.cache).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, running without result cache");
            None
        }
    };

    // ---- Metrics ----
    let metrics = MetricsRegistry::new();

    // ---- Components ----
    let store: Arc<dyn RecordStore> = Arc::new(PocketBaseStore::new(
        http_client.clone(),
        config.store.url.clone(),
    ));

    let rate_limit = RateLimitState::new();
    let upstream: Arc<dyn ReleaseSource> = Arc::new(GitHubReleaseSource::new(
        http_client.clone(),
        config.upstream.api_url.clone(),
        token,
        config.upstream.releases_per_page,
        rate_limit,
        metrics.metrics.clone(),
    ));

    let allowlist = AllowListStore::new(
        store.clone(),
        config.allowlist.refresh_ttl_secs,
        metrics.metrics.clone(),
    );

    let cache = Arc::new(RedisReleaseCache::new(
        redis.clone(),
        config.cache.result_ttl_secs,
    ));

    let resolver = Arc::new(Resolver::new(
        allowlist,
        cache,
        upstream,
        metrics.metrics.clone(),
    ));

    tracing::info!(
        store_url = %config.store.url,
        upstream = %config.upstream.api_url,
        cache_enabled = redis.is_some(),
        "components initialised"
    );

    // ---- App state ----
    let state = AppState {
        config: Arc::clone(&config),
        redis,
        http_client,
        metrics,
        store,
        resolver,
    };

    // ---- Serve ----
    run_http_server(state).await?;

    tracing::info!("tagwatch shut down cleanly");
    Ok(())
}
