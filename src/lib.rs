//! tagwatch — a release-tracking proxy for a curated list of GitHub
//! repositories.
//!
//! The service answers three questions for a frontend: which repositories are
//! tracked (`/api/repos`), how they are categorised (`/api/categories`), and
//! what their latest releases look like (`/api/github/{owner}/{repo}`).  Repo
//! and category metadata live in a PocketBase document store; release data is
//! fetched from the GitHub API on demand, gated by an allow-list derived from
//! the store, and cached in Redis with a bounded TTL.

pub mod allowlist;
pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod health;
pub mod http;
pub mod metrics;
pub mod resolver;
pub mod store;
pub mod upstream;
