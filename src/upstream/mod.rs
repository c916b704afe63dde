//! Upstream release-source abstraction.
//!
//! The resolver talks to GitHub through the [`ReleaseSource`] trait so that
//! no GitHub-specific URL construction or response parsing leaks outside this
//! module, and so tests can substitute a scripted implementation.

pub mod github;
pub mod rate_limit;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;

// ---------------------------------------------------------------------------
// Normalized types
// ---------------------------------------------------------------------------

/// A single release entry, normalized regardless of whether it came from a
/// formal GitHub release or was synthesized from a tag and its commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub tag: String,
    pub published_at: DateTime<Utc>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// A lightweight tag reference; the commit URL is fetched separately on the
/// fallback path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    pub name: String,
    pub commit_url: String,
}

/// Commit metadata needed to synthesize a [`ReleaseRecord`] from a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub author_date: DateTime<Utc>,
    pub html_url: String,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Read-only access to upstream release, tag, and commit data.
///
/// Implementations do not retry; retry policy, if any, belongs to callers.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Fetch the most recent releases, newest first.
    async fn fetch_releases(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<ReleaseRecord>, UpstreamError>;

    /// Fetch the most recent tags.
    async fn fetch_tags(&self, owner: &str, repo: &str) -> Result<Vec<TagRef>, UpstreamError>;

    /// Fetch the commit behind a tag, by the URL the tag listing returned.
    async fn fetch_commit(&self, url: &str) -> Result<CommitInfo, UpstreamError>;
}
