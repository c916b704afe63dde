//! Main axum router and HTTP request handlers.
//!
//! Routes:
//! - `GET /api/github/{owner}/{repo}` - release/tag data for one repository
//! - `GET /api/repos`                 - tracked repository listing
//! - `GET /api/categories`            - category listing
//! - `GET /healthz`                   - health check
//! - `GET /metrics`                   - Prometheus metrics

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{instrument, warn};

use crate::fallback;
use crate::http::AppState;
use crate::store::{RepoQuery, SortOrder};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the axum [`Router`] with all HTTP routes and shared state.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/api/github/{owner}/{repo}", get(handle_releases))
        .route("/api/repos", get(handle_repos))
        .route("/api/categories", get(handle_categories))
        .route("/healthz", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query parameter types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RepoListQuery {
    category: Option<String>,
    active: Option<String>,
    sort: Option<String>,
    order: Option<String>,
}

impl RepoListQuery {
    fn into_repo_query(self) -> RepoQuery {
        RepoQuery {
            category: self.category,
            // Only an explicit `active=false` includes inactive repos.
            active_only: self.active.as_deref() != Some("false"),
            sort: self.sort.unwrap_or_else(|| "priority".to_string()),
            order: SortOrder::parse(self.order.as_deref().unwrap_or("desc")),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /api/github/{owner}/{repo}`
///
/// Resolves the release sequence for one repository.  Successful responses
/// (including an empty sequence) carry a client-side `Cache-Control` bound to
/// the same TTL as the Redis entry, plus `Last-Modified` when data exists.
#[instrument(skip(state), fields(%owner, %repo))]
async fn handle_releases(
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
) -> Response {
    let ttl = state.config.cache.result_ttl_secs;
    let cache_control = format!("public, max-age={ttl}");

    match state.resolver.resolve(&owner, &repo).await {
        Ok(records) => {
            let newest = records.iter().map(|r| r.published_at).max();

            let mut response = (
                StatusCode::OK,
                [(header::CACHE_CONTROL, cache_control)],
                Json(&records),
            )
                .into_response();

            if let Some(newest) = newest {
                if let Ok(value) = HeaderValue::from_str(&http_date(newest)) {
                    response.headers_mut().insert(header::LAST_MODIFIED, value);
                }
            }
            response
        }
        Err(e) => {
            let mut response = e.into_response();
            if let Ok(value) = HeaderValue::from_str(&cache_control) {
                response.headers_mut().insert(header::CACHE_CONTROL, value);
            }
            response
        }
    }
}

/// `GET /api/repos`
///
/// Lists tracked repositories from the document store, with optional
/// category/active filtering and sorting.  Falls back to the hardcoded list
/// when the store is unreachable.
#[instrument(skip(state, query))]
async fn handle_repos(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RepoListQuery>,
) -> Response {
    let repo_query = query.into_repo_query();

    match state.store.list_repos(&repo_query).await {
        Ok(repos) => {
            let body = json!({
                "repos": repos,
                "total": repos.len(),
                "filters": {
                    "category": repo_query.category,
                    "active": repo_query.active_only,
                    "sortBy": repo_query.sort,
                    "order": match repo_query.order {
                        SortOrder::Asc => "asc",
                        SortOrder::Desc => "desc",
                    },
                },
            });
            (
                StatusCode::OK,
                [(header::CACHE_CONTROL, "public, max-age=300")],
                Json(body),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "repo listing failed, serving fallback");
            state.metrics.metrics.store_fallbacks.inc();
            let repos = fallback::fallback_repos();
            let body = json!({
                "repos": repos,
                "total": repos.len(),
                "fallback": true,
                "error": "document store unavailable",
            });
            (
                StatusCode::OK,
                [(header::CACHE_CONTROL, "no-cache")],
                Json(body),
            )
                .into_response()
        }
    }
}

/// `GET /api/categories`
#[instrument(skip(state))]
async fn handle_categories(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list_categories().await {
        Ok(categories) => (
            StatusCode::OK,
            [(header::CACHE_CONTROL, "public, max-age=3600")],
            Json(json!({ "categories": categories })),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "category listing failed, serving fallback");
            state.metrics.metrics.store_fallbacks.inc();
            (
                StatusCode::OK,
                [(header::CACHE_CONTROL, "no-cache")],
                Json(json!({
                    "categories": fallback::fallback_categories(),
                    "fallback": true,
                })),
            )
                .into_response()
        }
    }
}

/// `GET /healthz`
async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health_state = crate::health::HealthState {
        store: state.store.clone(),
        redis: state.redis.clone(),
        http_client: state.http_client.clone(),
        upstream_api_url: state.config.upstream.api_url.clone(),
    };
    crate::health::health_handler(axum::extract::State(health_state)).await
}

/// `GET /metrics`
async fn handle_metrics(State(state): State<Arc<AppState>>) -> Response {
    let mut buf = String::new();
    match prometheus_client::encoding::text::encode(&mut buf, &state.metrics.registry) {
        Ok(()) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "application/openmetrics-text; version=1.0.0; charset=utf-8",
            )],
            buf,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encoding failed: {e}"),
        )
            .into_response(),
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// RFC 7231 HTTP-date, for `Last-Modified`.
fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
