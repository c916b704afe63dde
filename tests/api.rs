//! Integration tests for the HTTP API.
//!
//! These drive the real router with scripted store/upstream implementations,
//! so every assertion covers routing, the resolver, and response shaping
//! end-to-end without touching the network.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::DateTime;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use tagwatch::allowlist::AllowListStore;
use tagwatch::cache::{ReleaseCache, RedisReleaseCache};
use tagwatch::config::Config;
use tagwatch::error::{StoreError, UpstreamError};
use tagwatch::http::{handler, AppState};
use tagwatch::metrics::MetricsRegistry;
use tagwatch::resolver::Resolver;
use tagwatch::store::{CategoryDescriptor, RecordStore, RepoDescriptor, RepoQuery};
use tagwatch::upstream::{CommitInfo, ReleaseRecord, ReleaseSource, TagRef};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

struct FixedStore {
    repos: Vec<RepoDescriptor>,
    categories: Vec<CategoryDescriptor>,
    available: bool,
}

impl FixedStore {
    fn up(repos: Vec<RepoDescriptor>, categories: Vec<CategoryDescriptor>) -> Self {
        Self {
            repos,
            categories,
            available: true,
        }
    }

    fn down() -> Self {
        Self {
            repos: Vec::new(),
            categories: Vec::new(),
            available: false,
        }
    }

    fn unavailable() -> StoreError {
        StoreError::Status {
            status: 503,
            message: "unavailable".into(),
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for FixedStore {
    async fn list_repos(&self, query: &RepoQuery) -> Result<Vec<RepoDescriptor>, StoreError> {
        if !self.available {
            return Err(Self::unavailable());
        }
        let mut repos: Vec<_> = self
            .repos
            .iter()
            .filter(|r| !query.active_only || r.active)
            .cloned()
            .collect();
        repos.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(repos)
    }

    async fn list_categories(&self) -> Result<Vec<CategoryDescriptor>, StoreError> {
        if !self.available {
            return Err(Self::unavailable());
        }
        Ok(self.categories.clone())
    }

    async fn health(&self) -> Result<(), StoreError> {
        if !self.available {
            return Err(Self::unavailable());
        }
        Ok(())
    }
}

#[derive(Default)]
struct FixedSource {
    releases: Vec<ReleaseRecord>,
    tags: Vec<TagRef>,
    commits: HashMap<String, CommitInfo>,
    rate_limit_reset: Option<chrono::DateTime<chrono::Utc>>,
}

#[async_trait::async_trait]
impl ReleaseSource for FixedSource {
    async fn fetch_releases(
        &self,
        _owner: &str,
        _repo: &str,
    ) -> Result<Vec<ReleaseRecord>, UpstreamError> {
        if let Some(reset_at) = self.rate_limit_reset {
            return Err(UpstreamError::RateLimited { reset_at });
        }
        Ok(self.releases.clone())
    }

    async fn fetch_tags(&self, _owner: &str, _repo: &str) -> Result<Vec<TagRef>, UpstreamError> {
        Ok(self.tags.clone())
    }

    async fn fetch_commit(&self, url: &str) -> Result<CommitInfo, UpstreamError> {
        self.commits
            .get(url)
            .cloned()
            .ok_or_else(|| UpstreamError::Status {
                status: 404,
                message: "GitHub API error: Not Found".into(),
            })
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn descriptor(owner: &str, repo: &str, priority: u8, active: bool) -> RepoDescriptor {
    RepoDescriptor {
        owner: owner.to_string(),
        repo: repo.to_string(),
        categories: vec!["DevOps".to_string()],
        priority,
        active,
        description: String::new(),
        last_checked: None,
    }
}

fn release(tag: &str, secs: i64) -> ReleaseRecord {
    ReleaseRecord {
        tag: tag.to_string(),
        published_at: DateTime::from_timestamp(secs, 0).unwrap(),
        url: format!("https://github.com/acme/widgets/releases/tag/{tag}"),
        body: None,
    }
}

fn app(store: FixedStore, source: FixedSource) -> axum::Router {
    app_with_config(store, source, Config::default())
}

fn app_with_config(store: FixedStore, source: FixedSource, config: Config) -> axum::Router {
    let config = Arc::new(config);
    let metrics = MetricsRegistry::new();
    let store: Arc<dyn RecordStore> = Arc::new(store);
    let source: Arc<dyn ReleaseSource> = Arc::new(source);

    let allowlist = AllowListStore::new(
        store.clone(),
        config.allowlist.refresh_ttl_secs,
        metrics.metrics.clone(),
    );
    let cache: Arc<dyn ReleaseCache> = Arc::new(RedisReleaseCache::new(
        None,
        config.cache.result_ttl_secs,
    ));
    let resolver = Arc::new(Resolver::new(
        allowlist,
        cache,
        source,
        metrics.metrics.clone(),
    ));

    let state = AppState {
        config,
        redis: None,
        http_client: reqwest::Client::new(),
        metrics,
        store,
        resolver,
    };
    handler::create_router(Arc::new(state))
}

async fn get(router: &axum::Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

// ---------------------------------------------------------------------------
// /api/github/{owner}/{repo}
// ---------------------------------------------------------------------------

#[tokio::test]
async fn releases_endpoint_returns_records_with_headers() {
    let store = FixedStore::up(vec![descriptor("acme", "widgets", 5, true)], Vec::new());
    let source = FixedSource {
        releases: vec![release("v2.0.0", 1_700_000_000), release("v1.0.0", 1_600_000_000)],
        ..FixedSource::default()
    };
    let router = app(store, source);

    let (status, headers, body) = get(&router, "/api/github/acme/widgets").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=3600"
    );
    assert_eq!(
        headers.get(header::LAST_MODIFIED).unwrap(),
        "Tue, 14 Nov 2023 22:13:20 GMT"
    );

    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["tag"], "v2.0.0");
    assert_eq!(records[1]["tag"], "v1.0.0");
}

#[tokio::test]
async fn malformed_owner_is_400_with_error_body() {
    let store = FixedStore::up(Vec::new(), Vec::new());
    let router = app(store, FixedSource::default());

    // `%20` decodes to a space, which fails shape validation.
    let (status, _, body) = get(&router, "/api/github/bad%20owner/widgets").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid repository or owner name format");
}

#[tokio::test]
async fn unlisted_repo_is_403() {
    let store = FixedStore::up(vec![descriptor("acme", "widgets", 5, true)], Vec::new());
    let router = app(store, FixedSource::default());

    let (status, _, body) = get(&router, "/api/github/acme/gadgets").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Repository not in allowed list");
}

#[tokio::test]
async fn store_outage_fails_closed_on_releases() {
    // No prior snapshot + unreachable store: nothing is allowed.
    let router = app(FixedStore::down(), FixedSource::default());

    let (status, _, body) = get(&router, "/api/github/acme/widgets").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Repository not in allowed list");
}

#[tokio::test]
async fn empty_release_and_tag_data_is_200_with_empty_array() {
    let store = FixedStore::up(vec![descriptor("acme", "widgets", 5, true)], Vec::new());
    let router = app(store, FixedSource::default());

    let (status, headers, body) = get(&router, "/api/github/acme/widgets").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
    // No data, no Last-Modified.
    assert!(headers.get(header::LAST_MODIFIED).is_none());
}

#[tokio::test]
async fn tag_fallback_synthesizes_records() {
    let store = FixedStore::up(vec![descriptor("acme", "widgets", 5, true)], Vec::new());
    let mut commits = HashMap::new();
    commits.insert(
        "commit://c1".to_string(),
        CommitInfo {
            author_date: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            html_url: "https://github.com/acme/widgets/commit/c1".to_string(),
        },
    );
    let source = FixedSource {
        tags: vec![TagRef {
            name: "v0.1.0".into(),
            commit_url: "commit://c1".into(),
        }],
        commits,
        ..FixedSource::default()
    };
    let router = app(store, source);

    let (status, _, body) = get(&router, "/api/github/acme/widgets").await;

    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["tag"], "v0.1.0");
    assert_eq!(records[0]["url"], "https://github.com/acme/widgets/commit/c1");
    assert!(records[0].get("body").is_none());
}

#[tokio::test]
async fn rate_limited_upstream_surfaces_403_with_reset() {
    let store = FixedStore::up(vec![descriptor("acme", "widgets", 5, true)], Vec::new());
    let source = FixedSource {
        rate_limit_reset: Some(DateTime::from_timestamp(1_700_000_000, 0).unwrap()),
        ..FixedSource::default()
    };
    let router = app(store, source);

    let (status, _, body) = get(&router, "/api/github/acme/widgets").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Rate limit exceeded."), "{message}");
    assert!(message.contains("2023-11-14T22:13:20"), "{message}");
}

// ---------------------------------------------------------------------------
// /api/repos and /api/categories
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repos_listing_reports_filters_and_total() {
    let store = FixedStore::up(
        vec![
            descriptor("acme", "widgets", 9, true),
            descriptor("acme", "gadgets", 4, true),
            descriptor("acme", "legacy", 1, false),
        ],
        Vec::new(),
    );
    let router = app(store, FixedSource::default());

    let (status, headers, body) = get(&router, "/api/repos").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=300"
    );
    assert_eq!(body["total"], 2);
    assert_eq!(body["repos"][0]["repo"], "widgets");
    assert_eq!(body["filters"]["active"], true);
    assert_eq!(body["filters"]["sortBy"], "priority");
    assert_eq!(body["filters"]["order"], "desc");
    assert!(body.get("fallback").is_none());
}

#[tokio::test]
async fn repos_listing_includes_inactive_when_asked() {
    let store = FixedStore::up(
        vec![
            descriptor("acme", "widgets", 9, true),
            descriptor("acme", "legacy", 1, false),
        ],
        Vec::new(),
    );
    let router = app(store, FixedSource::default());

    let (_, _, body) = get(&router, "/api/repos?active=false").await;

    assert_eq!(body["total"], 2);
    assert_eq!(body["filters"]["active"], false);
}

#[tokio::test]
async fn repos_listing_falls_back_when_store_is_down() {
    let router = app(FixedStore::down(), FixedSource::default());

    let (status, headers, body) = get(&router, "/api/repos").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-cache");
    assert_eq!(body["fallback"], true);
    assert!(body["total"].as_u64().unwrap() > 0);
    assert_eq!(body["repos"][0]["owner"], "chatwoot");
}

#[tokio::test]
async fn categories_listing_and_fallback() {
    let store = FixedStore::up(
        Vec::new(),
        vec![CategoryDescriptor {
            name: "DevOps".into(),
            color: "#2563eb".into(),
            icon: "🚀".into(),
        }],
    );
    let router = app(store, FixedSource::default());

    let (status, headers, body) = get(&router, "/api/categories").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=3600"
    );
    assert_eq!(body["categories"][0]["name"], "DevOps");
    assert!(body.get("fallback").is_none());

    let router = app(FixedStore::down(), FixedSource::default());
    let (status, _, body) = get(&router, "/api/categories").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fallback"], true);
    assert_eq!(body["categories"].as_array().unwrap().len(), 8);
}

// ---------------------------------------------------------------------------
// /healthz and /metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn healthz_degraded_when_store_is_down() {
    let mut config = Config::default();
    // Point the upstream check at a mock so the test stays offline.
    let upstream_server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("HEAD"))
        .respond_with(wiremock::ResponseTemplate::new(200))
        .mount(&upstream_server)
        .await;
    config.upstream.api_url = upstream_server.uri();

    let router = app_with_config(FixedStore::down(), FixedSource::default(), config);

    let (status, _, body) = get(&router, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["store"]["ok"], false);
    assert_eq!(body["checks"]["cache"]["ok"], true);
    assert_eq!(body["checks"]["upstream"]["ok"], true);
}

#[tokio::test]
async fn healthz_unhealthy_when_upstream_is_down() {
    let mut config = Config::default();
    let upstream_server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("HEAD"))
        .respond_with(wiremock::ResponseTemplate::new(500))
        .mount(&upstream_server)
        .await;
    config.upstream.api_url = upstream_server.uri();

    let store = FixedStore::up(Vec::new(), Vec::new());
    let router = app_with_config(store, FixedSource::default(), config);

    let (status, _, body) = get(&router, "/healthz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
}

#[tokio::test]
async fn metrics_endpoint_exposes_resolve_counters() {
    let store = FixedStore::up(vec![descriptor("acme", "widgets", 5, true)], Vec::new());
    let source = FixedSource {
        releases: vec![release("v1.0.0", 1_700_000_000)],
        ..FixedSource::default()
    };
    let router = app(store, source);

    get(&router, "/api/github/acme/widgets").await;

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("tagwatch_resolve_total"), "{text}");
    assert!(text.contains("tagwatch_result_cache_misses_total"), "{text}");
}
