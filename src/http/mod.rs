//! HTTP surface: shared application state and the axum router.

pub mod handler;

use std::sync::Arc;

use crate::config::Config;
use crate::metrics::MetricsRegistry;
use crate::resolver::Resolver;
use crate::store::RecordStore;

/// Global state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub redis: Option<fred::clients::Pool>,
    pub http_client: reqwest::Client,
    pub metrics: MetricsRegistry,
    pub store: Arc<dyn RecordStore>,
    pub resolver: Arc<Resolver>,
}
