//! GitHub REST API backend for the [`ReleaseSource`] trait.

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use crate::error::UpstreamError;
use crate::metrics::{EndpointLabels, Metrics};

use super::rate_limit::{parse_reset_header, RateLimitState};
use super::{CommitInfo, ReleaseRecord, ReleaseSource, TagRef};

// ---------------------------------------------------------------------------
// Backend struct
// ---------------------------------------------------------------------------

pub struct GitHubReleaseSource {
    http_client: reqwest::Client,
    api_url: String,
    token: String,
    accept: &'static str,
    per_page: u32,
    rate_limit: RateLimitState,
    metrics: Arc<Metrics>,
}

impl GitHubReleaseSource {
    /// `token` must already be resolved; callers treat a missing credential
    /// as a fatal startup error, never a per-request one.
    pub fn new(
        http_client: reqwest::Client,
        api_url: impl Into<String>,
        token: String,
        per_page: u32,
        rate_limit: RateLimitState,
        metrics: Arc<Metrics>,
    ) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            http_client,
            api_url,
            token,
            accept: "application/vnd.github.v3+json",
            per_page,
            rate_limit,
            metrics,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        endpoint: &'static str,
    ) -> Result<T, UpstreamError> {
        self.metrics
            .upstream_api_calls
            .get_or_create(&EndpointLabels {
                endpoint: endpoint.to_string(),
            })
            .inc();

        let resp = self
            .http_client
            .get(url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", self.accept)
            .send()
            .await?;

        self.rate_limit.update_from_headers(resp.headers());
        if let Some(remaining) = self.rate_limit.known_remaining() {
            self.metrics
                .upstream_rate_limit_remaining
                .set(remaining.min(i64::MAX as u64) as i64);
        }

        let status = resp.status();
        if !status.is_success() {
            if status == StatusCode::FORBIDDEN {
                let reset_at = parse_reset_header(resp.headers());
                warn!(endpoint, reset_at = %reset_at.to_rfc3339(), "upstream rate limit exhausted");
                return Err(UpstreamError::RateLimited { reset_at });
            }
            warn!(endpoint, %status, "upstream API returned non-success");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message: format!(
                    "GitHub API error: {}",
                    status.canonical_reason().unwrap_or("unknown")
                ),
            });
        }

        Ok(resp.json::<T>().await?)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiRelease {
    tag_name: String,
    /// Null for draft releases, which carry no usable timestamp.
    published_at: Option<DateTime<Utc>>,
    html_url: String,
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTag {
    name: String,
    commit: ApiTagCommit,
}

#[derive(Debug, Deserialize)]
struct ApiTagCommit {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiCommit {
    html_url: String,
    commit: ApiCommitDetail,
}

#[derive(Debug, Deserialize)]
struct ApiCommitDetail {
    author: ApiCommitAuthor,
}

#[derive(Debug, Deserialize)]
struct ApiCommitAuthor {
    date: DateTime<Utc>,
}

fn into_release_record(release: ApiRelease) -> Option<ReleaseRecord> {
    let published_at = release.published_at?;
    Some(ReleaseRecord {
        tag: release.tag_name,
        published_at,
        url: release.html_url,
        body: release.body,
    })
}

// ---------------------------------------------------------------------------
// Trait implementation
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
impl ReleaseSource for GitHubReleaseSource {
    async fn fetch_releases(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<ReleaseRecord>, UpstreamError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/releases?per_page={}",
            self.api_url, self.per_page
        );
        let releases: Vec<ApiRelease> = self.get_json(&url, "releases").await?;
        Ok(releases.into_iter().filter_map(into_release_record).collect())
    }

    async fn fetch_tags(&self, owner: &str, repo: &str) -> Result<Vec<TagRef>, UpstreamError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/tags?per_page={}",
            self.api_url, self.per_page
        );
        let tags: Vec<ApiTag> = self.get_json(&url, "tags").await?;
        Ok(tags
            .into_iter()
            .map(|t| TagRef {
                name: t.name,
                commit_url: t.commit.url,
            })
            .collect())
    }

    async fn fetch_commit(&self, url: &str) -> Result<CommitInfo, UpstreamError> {
        let commit: ApiCommit = self.get_json(url, "commit").await?;
        Ok(CommitInfo {
            author_date: commit.commit.author.date,
            html_url: commit.html_url,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
