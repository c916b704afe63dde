//! Document store abstraction.
//!
//! Repo and category metadata live in a PocketBase instance that is owned and
//! mutated by an external seeding process; this service only ever reads.  The
//! [`RecordStore`] trait keeps PocketBase specifics out of the allow-list and
//! the HTTP handlers.

pub mod pocketbase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// A tracked repository as persisted in the `repos` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoDescriptor {
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub description: String,
    /// Store-formatted timestamp, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<String>,
}

fn default_priority() -> u8 {
    1
}

fn default_active() -> bool {
    true
}

/// A category as persisted in the `categories` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDescriptor {
    pub name: String,
    /// Hex color string, e.g. `#2563eb`.
    pub color: String,
    pub icon: String,
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Anything other than `asc` sorts descending, matching the listing
    /// endpoint's default.
    pub fn parse(s: &str) -> Self {
        match s {
            "asc" => Self::Asc,
            _ => Self::Desc,
        }
    }
}

/// Filter and ordering for a repo listing.
#[derive(Debug, Clone)]
pub struct RepoQuery {
    pub category: Option<String>,
    pub active_only: bool,
    pub sort: String,
    pub order: SortOrder,
}

impl Default for RepoQuery {
    fn default() -> Self {
        Self {
            category: None,
            active_only: true,
            sort: "priority".to_string(),
            order: SortOrder::Desc,
        }
    }
}

impl RepoQuery {
    /// Every descriptor, active or not.  The allow-list refresh uses this.
    pub fn unfiltered() -> Self {
        Self {
            active_only: false,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Read-only access to the backing document store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Full repo descriptor list matching `query`.
    async fn list_repos(&self, query: &RepoQuery) -> Result<Vec<RepoDescriptor>, StoreError>;

    /// All categories, sorted by name.
    async fn list_categories(&self) -> Result<Vec<CategoryDescriptor>, StoreError>;

    /// Cheap reachability probe for the health endpoint.
    async fn health(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_order_defaults_to_desc() {
        assert_eq!(SortOrder::parse("asc"), SortOrder::Asc);
        assert_eq!(SortOrder::parse("desc"), SortOrder::Desc);
        assert_eq!(SortOrder::parse("sideways"), SortOrder::Desc);
    }

    #[test]
    fn descriptor_defaults_apply_on_sparse_records() {
        let descriptor: RepoDescriptor = serde_json::from_value(serde_json::json!({
            "owner": "acme",
            "repo": "widgets"
        }))
        .unwrap();
        assert_eq!(descriptor.priority, 1);
        assert!(descriptor.active);
        assert!(descriptor.categories.is_empty());
        assert_eq!(descriptor.description, "");
        assert_eq!(descriptor.last_checked, None);
    }
}
