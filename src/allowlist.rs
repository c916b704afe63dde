//! In-memory allow-list of repositories this service will proxy upstream
//! data for.
//!
//! The list of permitted `owner/repo` pairs is derived from the document
//! store's `repos` collection and held as a TTL-bounded snapshot.  Refreshes
//! are lazy: the first lookup after expiry reloads the collection.  When the
//! store is unreachable the policy is fail-closed if no snapshot has ever
//! been built, and stale-but-available otherwise.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::metrics::Metrics;
use crate::store::{RecordStore, RepoQuery};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

struct AllowListSnapshot {
    entries: HashSet<String>,
    expires_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct AllowListStore {
    store: Arc<dyn RecordStore>,
    ttl: Duration,
    metrics: Arc<Metrics>,
    snapshot: RwLock<Option<AllowListSnapshot>>,
}

impl AllowListStore {
    pub fn new(store: Arc<dyn RecordStore>, ttl_secs: u64, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            ttl: Duration::seconds(ttl_secs as i64),
            metrics,
            snapshot: RwLock::new(None),
        }
    }

    /// Case-sensitive exact-match lookup of `owner/repo`, refreshing the
    /// snapshot first when it is missing or expired.
    pub async fn is_allowed(&self, owner: &str, repo: &str) -> bool {
        let key = format!("{owner}/{repo}");

        // Fast path: a valid snapshot only needs the read lock.
        {
            let guard = self.snapshot.read().await;
            if let Some(snapshot) = guard.as_ref() {
                if Utc::now() < snapshot.expires_at {
                    return snapshot.entries.contains(&key);
                }
            }
        }

        self.lookup_after_refresh(&key).await
    }

    async fn lookup_after_refresh(&self, key: &str) -> bool {
        let mut guard = self.snapshot.write().await;

        // Another request may have refreshed while we waited for the lock.
        if let Some(snapshot) = guard.as_ref() {
            if Utc::now() < snapshot.expires_at {
                return snapshot.entries.contains(key);
            }
        }

        match self.store.list_repos(&RepoQuery::unfiltered()).await {
            Ok(repos) => {
                let entries: HashSet<String> = repos
                    .iter()
                    .map(|r| format!("{}/{}", r.owner, r.repo))
                    .collect();
                self.metrics.allowlist_refreshes.inc();
                info!(count = entries.len(), "allow-list snapshot refreshed");

                let allowed = entries.contains(key);
                *guard = Some(AllowListSnapshot {
                    entries,
                    expires_at: Utc::now() + self.ttl,
                });
                allowed
            }
            Err(e) => {
                self.metrics.allowlist_refresh_failures.inc();
                match guard.as_ref() {
                    // Stale-but-available: keep serving the expired snapshot
                    // and retry the refresh on the next lookup.
                    Some(stale) => {
                        warn!(error = %e, "allow-list refresh failed, serving stale snapshot");
                        stale.entries.contains(key)
                    }
                    // Fail closed: nothing is allowed until the store answers.
                    None => {
                        warn!(error = %e, "allow-list refresh failed with no prior snapshot, denying all");
                        false
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
