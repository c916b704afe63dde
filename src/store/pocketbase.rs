//! PocketBase records API client.
//!
//! Talks to `/api/collections/{collection}/records`, following the paged
//! list shape (`page` / `totalPages` / `items`) until the full collection has
//! been read.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::StoreError;

use super::{CategoryDescriptor, RecordStore, RepoDescriptor, RepoQuery, SortOrder};

const PAGE_SIZE: u32 = 200;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct PocketBaseStore {
    http_client: reqwest::Client,
    base_url: String,
}

impl PocketBaseStore {
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http_client,
            base_url,
        }
    }

    /// Fetch every record of `collection`, page by page.
    async fn list_all<T: DeserializeOwned>(
        &self,
        collection: &str,
        sort: &str,
        filter: Option<&str>,
    ) -> Result<Vec<T>, StoreError> {
        let url = format!("{}/api/collections/{collection}/records", self.base_url);
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let mut request = self.http_client.get(&url).query(&[
                ("page", page.to_string()),
                ("perPage", PAGE_SIZE.to_string()),
                ("sort", sort.to_string()),
            ]);
            if let Some(filter) = filter {
                request = request.query(&[("filter", filter)]);
            }

            let resp = request.send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(StoreError::Status {
                    status: status.as_u16(),
                    message: status.canonical_reason().unwrap_or("unknown").to_string(),
                });
            }

            let body: RecordPage<T> = resp.json().await?;
            items.extend(body.items);

            if body.page >= body.total_pages {
                break;
            }
            page += 1;
        }

        debug!(collection, count = items.len(), "document store list complete");
        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct RecordPage<T> {
    page: u32,
    #[serde(rename = "totalPages")]
    total_pages: u32,
    items: Vec<T>,
}

/// Build a PocketBase filter expression from a repo query.
fn build_filter(query: &RepoQuery) -> Option<String> {
    let mut parts = Vec::new();
    if query.active_only {
        parts.push("active = true".to_string());
    }
    if let Some(category) = &query.category {
        // Single quotes would terminate the filter literal; strip them.
        let category: String = category.chars().filter(|c| *c != '\'').collect();
        parts.push(format!("categories ~ '{category}'"));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" && "))
    }
}

fn build_sort(query: &RepoQuery) -> String {
    match query.order {
        SortOrder::Desc => format!("-{}", query.sort),
        SortOrder::Asc => query.sort.clone(),
    }
}

// ---------------------------------------------------------------------------
// Trait implementation
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
impl RecordStore for PocketBaseStore {
    async fn list_repos(&self, query: &RepoQuery) -> Result<Vec<RepoDescriptor>, StoreError> {
        let sort = build_sort(query);
        let filter = build_filter(query);
        self.list_all("repos", &sort, filter.as_deref()).await
    }

    async fn list_categories(&self) -> Result<Vec<CategoryDescriptor>, StoreError> {
        self.list_all("categories", "name", None).await
    }

    async fn health(&self) -> Result<(), StoreError> {
        let url = format!("{}/api/health", self.base_url);
        let resp = self.http_client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
