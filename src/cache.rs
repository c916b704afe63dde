//! Redis-backed result cache for release data.
//!
//! The cache is strictly optional: when no endpoint is configured, or when
//! Redis misbehaves at runtime, every `get` is a miss and every `put` is a
//! no-op.  Callers never see a cache error.

use anyhow::{Context, Result};
use async_trait::async_trait;
use fred::clients::Pool;
use fred::interfaces::{ClientLike, KeysInterface};
use fred::types::config::{Config as FredConfig, ReconnectPolicy, ServerConfig, TlsConnector};
use tracing::{trace, warn};

use crate::config::CacheConfig;
use crate::upstream::ReleaseRecord;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Key-value cache of resolved release sequences with a fixed TTL.  Holds no
/// business logic; the resolver decides what is worth caching.
#[async_trait]
pub trait ReleaseCache: Send + Sync {
    async fn get(&self, owner: &str, repo: &str) -> Option<Vec<ReleaseRecord>>;
    async fn put(&self, owner: &str, repo: &str, records: &[ReleaseRecord]);
}

// ---------------------------------------------------------------------------
// Redis implementation
// ---------------------------------------------------------------------------

pub struct RedisReleaseCache {
    pool: Option<Pool>,
    ttl_secs: u64,
}

impl RedisReleaseCache {
    pub fn new(pool: Option<Pool>, ttl_secs: u64) -> Self {
        Self { pool, ttl_secs }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }
}

fn cache_key(owner: &str, repo: &str) -> String {
    format!("tagwatch:releases:{owner}:{repo}")
}

#[async_trait]
impl ReleaseCache for RedisReleaseCache {
    async fn get(&self, owner: &str, repo: &str) -> Option<Vec<ReleaseRecord>> {
        let pool = self.pool.as_ref()?;
        let key = cache_key(owner, repo);

        let raw: Option<String> = match pool.get(&key).await {
            Ok(v) => v,
            Err(e) => {
                warn!(%owner, %repo, error = %e, "result cache GET failed");
                return None;
            }
        };

        match serde_json::from_str(&raw?) {
            Ok(records) => {
                trace!(key, "result cache hit");
                Some(records)
            }
            Err(e) => {
                warn!(key, error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }

    async fn put(&self, owner: &str, repo: &str, records: &[ReleaseRecord]) {
        let Some(pool) = self.pool.as_ref() else {
            return;
        };
        let key = cache_key(owner, repo);

        let payload = match serde_json::to_string(records) {
            Ok(p) => p,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize cache payload");
                return;
            }
        };

        let result: std::result::Result<(), _> = pool
            .set(
                &key,
                payload,
                Some(fred::types::Expiration::EX(self.ttl_secs as i64)),
                None,
                false,
            )
            .await;
        match result {
            Ok(()) => trace!(key, ttl_secs = self.ttl_secs, "result cache set"),
            Err(e) => warn!(%owner, %repo, error = %e, "result cache SET failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pool setup
// ---------------------------------------------------------------------------

/// Build a Redis connection pool from the cache config.  Returns `None`
/// without error when no endpoint is configured.
pub async fn build_redis_pool(config: &CacheConfig) -> Result<Option<Pool>> {
    let Some(endpoint) = &config.endpoint else {
        return Ok(None);
    };

    let auth_token = std::env::var(&config.auth_token_env).ok();

    let endpoint = endpoint
        .trim_start_matches("rediss://")
        .trim_start_matches("redis://");
    let (host, port) = parse_host_port(endpoint)?;
    let server_config = ServerConfig::new_centralized(host, port);

    let mut fred_config = FredConfig {
        server: server_config,
        ..FredConfig::default()
    };

    if config.tls {
        fred_config.tls = Some(TlsConnector::default_rustls()?.into());
    }

    if let Some(token) = auth_token {
        fred_config.password = Some(token);
    }

    let mut builder = fred::types::Builder::from_config(fred_config);
    builder.set_policy(ReconnectPolicy::new_exponential(0, 100, 30_000, 2));

    let pool = builder.build_pool(3)?;
    pool.init().await.context("failed to connect to Redis")?;

    tracing::info!("Redis pool initialised");
    Ok(Some(pool))
}

fn parse_host_port(endpoint: &str) -> Result<(String, u16)> {
    match endpoint.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port
                .parse()
                .with_context(|| format!("invalid Redis port in endpoint: {endpoint}"))?;
            Ok((host.to_string(), port))
        }
        None => Ok((endpoint.to_string(), 6379)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
