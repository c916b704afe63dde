//! Error taxonomy.
//!
//! Only [`ResolveError`] reaches HTTP callers; upstream and store failures
//! are typed separately so the resolver and the allow-list can decide which
//! of them degrade safely and which surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::error;

// ---------------------------------------------------------------------------
// Upstream client errors
// ---------------------------------------------------------------------------

/// A failed call against the GitHub API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Quota exhausted (HTTP 403 with a rate-limit-reset header).
    #[error("rate limit exceeded, resets at {}", reset_at.to_rfc3339())]
    RateLimited { reset_at: DateTime<Utc> },
    /// Any other non-success response.
    #[error("{message}")]
    Status { status: u16, message: String },
    /// Transport-level failure (connect, TLS, body read, JSON decode).
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// Document store errors
// ---------------------------------------------------------------------------

/// A failed call against the PocketBase records API.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("document store returned {status}: {message}")]
    Status { status: u16, message: String },
}

// ---------------------------------------------------------------------------
// Resolver errors (the surfaced taxonomy)
// ---------------------------------------------------------------------------

/// Outcome of a failed `resolve` call, mapped 1:1 onto HTTP responses.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Owner or repo failed shape validation.  Local, never retried.
    #[error("Invalid repository or owner name format")]
    InvalidIdentity,
    /// Identity is well-formed but absent from the allow-list.
    #[error("Repository not in allowed list")]
    NotAllowed,
    /// Upstream quota exhausted; surfaced verbatim, no automatic retry.
    #[error("Rate limit exceeded. Resets at {}", reset_at.to_rfc3339())]
    RateLimited { reset_at: DateTime<Utc> },
    /// Any other non-success upstream response, status passed through.
    #[error("{message}")]
    Upstream { status: u16, message: String },
    /// Unexpected failure; the cause is logged, the caller gets a generic
    /// message.
    #[error("Failed to fetch data")]
    Internal(#[source] anyhow::Error),
}

impl ResolveError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidIdentity => StatusCode::BAD_REQUEST,
            Self::NotAllowed | Self::RateLimited { .. } => StatusCode::FORBIDDEN,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UpstreamError> for ResolveError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::RateLimited { reset_at } => Self::RateLimited { reset_at },
            UpstreamError::Status { status, message } => Self::Upstream { status, message },
            UpstreamError::Transport(e) => Self::Internal(e.into()),
        }
    }
}

impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref cause) = self {
            error!(error = %cause, "internal error while resolving repository data");
        }
        let body = Json(json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}
