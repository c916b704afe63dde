//! The repository resolver — the orchestrator behind
//! `GET /api/github/{owner}/{repo}`.
//!
//! A resolve call short-circuits on the first decisive outcome, in order:
//! shape validation, cache probe, allow-list check, two-tier upstream fetch
//! (releases, then tags with their commits), write-through.
//!
//! The cache is probed before the allow-list on purpose: a hit skips both the
//! store and GitHub entirely.  The accepted consequence is that a repository
//! removed from the allow-list keeps serving its cached releases until the
//! cache TTL lapses.

use std::sync::Arc;

use futures::future;
use tracing::{debug, warn};

use crate::allowlist::AllowListStore;
use crate::cache::ReleaseCache;
use crate::error::{ResolveError, UpstreamError};
use crate::metrics::{Metrics, ResolveLabels, ResolveOutcome};
use crate::upstream::{ReleaseRecord, ReleaseSource};

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A valid identity segment matches `^[\w.-]+$`: word characters, dot,
/// hyphen.  No slashes, no whitespace, never empty.
fn is_valid_segment(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'))
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

pub struct Resolver {
    allowlist: AllowListStore,
    cache: Arc<dyn ReleaseCache>,
    upstream: Arc<dyn ReleaseSource>,
    metrics: Arc<Metrics>,
}

impl Resolver {
    pub fn new(
        allowlist: AllowListStore,
        cache: Arc<dyn ReleaseCache>,
        upstream: Arc<dyn ReleaseSource>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            allowlist,
            cache,
            upstream,
            metrics,
        }
    }

    fn count_outcome(&self, outcome: ResolveOutcome) {
        self.metrics
            .resolve_total
            .get_or_create(&ResolveLabels { outcome })
            .inc();
    }

    /// Resolve the release sequence for `owner/repo`.
    ///
    /// An empty sequence is a success, not an error, and is never cached, so
    /// a repository without releases is rechecked on every call.
    pub async fn resolve(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<ReleaseRecord>, ResolveError> {
        if !is_valid_segment(owner) || !is_valid_segment(repo) {
            self.count_outcome(ResolveOutcome::Invalid);
            return Err(ResolveError::InvalidIdentity);
        }

        if let Some(records) = self.cache.get(owner, repo).await {
            debug!(%owner, %repo, "serving releases from result cache");
            self.metrics.result_cache_hits.inc();
            self.count_outcome(ResolveOutcome::CacheHit);
            return Ok(records);
        }
        self.metrics.result_cache_misses.inc();

        if !self.allowlist.is_allowed(owner, repo).await {
            warn!(%owner, %repo, "repository not in allowed list");
            self.count_outcome(ResolveOutcome::Denied);
            return Err(ResolveError::NotAllowed);
        }

        let records = match self.fetch_upstream(owner, repo).await {
            Ok(records) => records,
            Err(e) => {
                warn!(%owner, %repo, error = %e, "upstream fetch failed");
                self.count_outcome(match e {
                    UpstreamError::RateLimited { .. } => ResolveOutcome::RateLimited,
                    _ => ResolveOutcome::Error,
                });
                return Err(e.into());
            }
        };

        if !records.is_empty() {
            self.cache.put(owner, repo, &records).await;
        }

        self.count_outcome(ResolveOutcome::Fetched);
        Ok(records)
    }

    /// Releases first; when a repository publishes none, fall back to tags
    /// and synthesize release records from their commits.
    async fn fetch_upstream(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<ReleaseRecord>, UpstreamError> {
        let releases = self.upstream.fetch_releases(owner, repo).await?;
        if !releases.is_empty() {
            return Ok(releases);
        }

        let tags = self.upstream.fetch_tags(owner, repo).await?;
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        debug!(%owner, %repo, tags = tags.len(), "no releases, synthesizing from tags");

        // Commit lookups run concurrently; zipping against `tags` keeps the
        // output in tag order no matter which fetch completes first.
        let commits = future::try_join_all(
            tags.iter()
                .map(|tag| self.upstream.fetch_commit(&tag.commit_url)),
        )
        .await?;

        Ok(tags
            .into_iter()
            .zip(commits)
            .map(|(tag, commit)| ReleaseRecord {
                tag: tag.name,
                published_at: commit.author_date,
                url: commit.html_url,
                body: None,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
