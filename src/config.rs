use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub allowlist: AllowListConfig,
}

// ---------------------------------------------------------------------------
// HTTP server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address for the HTTP listener (e.g. `0.0.0.0:8080`).
    #[serde(default = "default_http_listen")]
    pub http_listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_listen: default_http_listen(),
        }
    }
}

fn default_http_listen() -> String {
    "0.0.0.0:8080".to_string()
}

// ---------------------------------------------------------------------------
// Upstream (GitHub API)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Full URL to the upstream API root.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Name of the environment variable that holds the GitHub token.
    ///
    /// The token is resolved once at process start; a missing or empty value
    /// is a fatal configuration error, not a per-request failure.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// How many releases (and, on the tag fallback path, tags) to request.
    #[serde(default = "default_releases_per_page")]
    pub releases_per_page: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_env: default_token_env(),
            releases_per_page: default_releases_per_page(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_releases_per_page() -> u32 {
    3
}

// ---------------------------------------------------------------------------
// Document store (PocketBase)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the PocketBase instance.
    #[serde(default = "default_store_url")]
    pub url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
        }
    }
}

fn default_store_url() -> String {
    "http://pocketbase:8090".to_string()
}

// ---------------------------------------------------------------------------
// Result cache (Redis)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Connection string (e.g. `redis://redis.local:6379`).  When absent the
    /// result cache is disabled and every lookup goes straight upstream.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Enable TLS for the Redis connection.
    #[serde(default)]
    pub tls: bool,
    /// Name of the environment variable that holds the Redis auth token.
    #[serde(default = "default_cache_auth_env")]
    pub auth_token_env: String,
    /// TTL (seconds) for cached release data.
    #[serde(default = "default_result_ttl")]
    pub result_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            tls: false,
            auth_token_env: default_cache_auth_env(),
            result_ttl_secs: default_result_ttl(),
        }
    }
}

fn default_cache_auth_env() -> String {
    "REDIS_AUTH_TOKEN".to_string()
}

fn default_result_ttl() -> u64 {
    3600
}

// ---------------------------------------------------------------------------
// Allow-list
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AllowListConfig {
    /// TTL (seconds) of the in-memory allow-list snapshot.
    #[serde(default = "default_allowlist_ttl")]
    pub refresh_ttl_secs: u64,
}

impl Default for AllowListConfig {
    fn default() -> Self {
        Self {
            refresh_ttl_secs: default_allowlist_ttl(),
        }
    }
}

fn default_allowlist_ttl() -> u64 {
    300
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Load and validate a [`Config`] from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Basic sanity checks that cannot be expressed purely with serde.
fn validate_config(config: &Config) -> Result<()> {
    anyhow::ensure!(
        (1..=100).contains(&config.upstream.releases_per_page),
        "releases_per_page must be 1-100"
    );
    anyhow::ensure!(
        config.cache.result_ttl_secs > 0,
        "result_ttl_secs must be non-zero"
    );
    anyhow::ensure!(
        config.allowlist.refresh_ttl_secs > 0,
        "refresh_ttl_secs must be non-zero"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_gets_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.server.http_listen, "0.0.0.0:8080");
        assert_eq!(config.upstream.api_url, "https://api.github.com");
        assert_eq!(config.upstream.token_env, "GITHUB_TOKEN");
        assert_eq!(config.upstream.releases_per_page, 3);
        assert_eq!(config.store.url, "http://pocketbase:8090");
        assert!(config.cache.endpoint.is_none());
        assert_eq!(config.cache.result_ttl_secs, 3600);
        assert_eq!(config.allowlist.refresh_ttl_secs, 300);
    }

    #[test]
    fn partial_config_overrides_defaults() {
        let yaml = r#"
upstream:
  api_url: https://ghe.corp.example.com/api/v3
  releases_per_page: 5
cache:
  endpoint: redis://cache.local:6379
  result_ttl_secs: 120
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.upstream.api_url,
            "https://ghe.corp.example.com/api/v3"
        );
        assert_eq!(config.upstream.releases_per_page, 5);
        assert_eq!(
            config.cache.endpoint.as_deref(),
            Some("redis://cache.local:6379")
        );
        assert_eq!(config.cache.result_ttl_secs, 120);
        // Untouched sections keep their defaults.
        assert_eq!(config.store.url, "http://pocketbase:8090");
    }

    #[test]
    fn load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  http_listen: 127.0.0.1:9000").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.http_listen, "127.0.0.1:9000");
    }

    #[test]
    fn load_config_missing_file_fails() {
        assert!(load_config("/nonexistent/tagwatch.yaml").is_err());
    }

    #[test]
    fn validate_rejects_zero_per_page() {
        let mut config = Config::default();
        config.upstream.releases_per_page = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn validate_rejects_zero_ttl() {
        let mut config = Config::default();
        config.cache.result_ttl_secs = 0;
        assert!(validate_config(&config).is_err());
    }
}
