use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::store::RecordStore;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HealthChecks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub store: CheckResult,
    pub cache: CheckResult,
    pub upstream: CheckResult,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckResult {
    fn healthy() -> Self {
        Self {
            ok: true,
            detail: None,
        }
    }

    fn healthy_with(detail: impl Into<String>) -> Self {
        Self {
            ok: true,
            detail: Some(detail.into()),
        }
    }

    fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: Some(detail.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared state expected by the handler
// ---------------------------------------------------------------------------

/// Minimal subset of `AppState` required by the health-check handler.
#[derive(Clone)]
pub struct HealthState {
    pub store: Arc<dyn RecordStore>,
    pub redis: Option<fred::clients::Pool>,
    pub http_client: reqwest::Client,
    pub upstream_api_url: String,
}

// ---------------------------------------------------------------------------
// Individual checks
// ---------------------------------------------------------------------------

async fn check_store(store: &Arc<dyn RecordStore>) -> CheckResult {
    match store.health().await {
        Ok(()) => CheckResult::healthy(),
        Err(e) => CheckResult::unhealthy(format!("store health probe failed: {e}")),
    }
}

async fn check_cache(redis: &Option<fred::clients::Pool>) -> CheckResult {
    match redis {
        None => CheckResult::healthy_with("not configured"),
        Some(pool) => match fred::interfaces::ClientLike::ping::<String>(pool, None).await {
            Ok(_) => CheckResult::healthy(),
            Err(e) => CheckResult::unhealthy(format!("PING failed: {e}")),
        },
    }
}

async fn check_upstream(client: &reqwest::Client, api_url: &str) -> CheckResult {
    let url = api_url.trim_end_matches('/');
    match client.head(url).send().await {
        Ok(resp) if resp.status().is_success() || resp.status().is_redirection() => {
            CheckResult::healthy()
        }
        Ok(resp) => CheckResult::unhealthy(format!("HEAD {} returned {}", url, resp.status())),
        Err(e) => CheckResult::unhealthy(format!("HEAD {url} failed: {e}")),
    }
}

// ---------------------------------------------------------------------------
// Aggregate status
// ---------------------------------------------------------------------------

/// Store and cache outages have safe degraded behaviors (fallback payloads,
/// stale allow-list, pass-through cache), so they only degrade.  Without the
/// upstream API the core endpoint cannot answer at all.
fn aggregate_status(checks: &HealthChecks) -> HealthStatus {
    if !checks.upstream.ok {
        HealthStatus::Unhealthy
    } else if checks.store.ok && checks.cache.ok {
        HealthStatus::Ok
    } else {
        HealthStatus::Degraded
    }
}

// ---------------------------------------------------------------------------
// Axum handler
// ---------------------------------------------------------------------------

/// `GET /healthz` handler.  Returns 200 on Ok/Degraded, 503 on Unhealthy.
pub async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let (store, cache, upstream) = tokio::join!(
        check_store(&state.store),
        check_cache(&state.redis),
        check_upstream(&state.http_client, &state.upstream_api_url),
    );

    let checks = HealthChecks {
        store,
        cache,
        upstream,
    };
    let status = aggregate_status(&checks);
    let body = HealthResponse { status, checks };

    let http_status = match status {
        HealthStatus::Ok | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (http_status, Json(body))
}
