use std::sync::Arc;

use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

// ---------------------------------------------------------------------------
// Label types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ResolveLabels {
    pub outcome: ResolveOutcome,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum ResolveOutcome {
    CacheHit,
    Fetched,
    Denied,
    Invalid,
    RateLimited,
    Error,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct EndpointLabels {
    pub endpoint: String,
}

// ---------------------------------------------------------------------------
// Metrics struct
// ---------------------------------------------------------------------------

/// Central container for every Prometheus metric exposed by the service.
pub struct Metrics {
    // -- resolver --
    pub resolve_total: Family<ResolveLabels, Counter>,

    // -- result cache --
    pub result_cache_hits: Counter,
    pub result_cache_misses: Counter,

    // -- upstream API --
    pub upstream_api_calls: Family<EndpointLabels, Counter>,
    pub upstream_rate_limit_remaining: Gauge,

    // -- allow-list --
    pub allowlist_refreshes: Counter,
    pub allowlist_refresh_failures: Counter,

    // -- document store --
    pub store_fallbacks: Counter,
}

impl Metrics {
    /// Create a new [`Metrics`] instance and register every metric with the
    /// supplied `registry`.
    pub fn new(registry: &mut Registry) -> Self {
        let resolve_total = Family::<ResolveLabels, Counter>::default();
        registry.register(
            "tagwatch_resolve_total",
            "Release resolution requests by outcome",
            resolve_total.clone(),
        );

        let result_cache_hits = Counter::default();
        registry.register(
            "tagwatch_result_cache_hits_total",
            "Result cache hits",
            result_cache_hits.clone(),
        );

        let result_cache_misses = Counter::default();
        registry.register(
            "tagwatch_result_cache_misses_total",
            "Result cache misses",
            result_cache_misses.clone(),
        );

        let upstream_api_calls = Family::<EndpointLabels, Counter>::default();
        registry.register(
            "tagwatch_upstream_api_calls_total",
            "GitHub API call count by endpoint",
            upstream_api_calls.clone(),
        );

        let upstream_rate_limit_remaining: Gauge = Gauge::default();
        registry.register(
            "tagwatch_upstream_rate_limit_remaining",
            "Remaining GitHub API calls before the rate limit resets",
            upstream_rate_limit_remaining.clone(),
        );

        let allowlist_refreshes = Counter::default();
        registry.register(
            "tagwatch_allowlist_refreshes_total",
            "Successful allow-list snapshot refreshes",
            allowlist_refreshes.clone(),
        );

        let allowlist_refresh_failures = Counter::default();
        registry.register(
            "tagwatch_allowlist_refresh_failures_total",
            "Failed allow-list snapshot refreshes",
            allowlist_refresh_failures.clone(),
        );

        let store_fallbacks = Counter::default();
        registry.register(
            "tagwatch_store_fallbacks_total",
            "Listing requests served from the hardcoded fallback payloads",
            store_fallbacks.clone(),
        );

        Self {
            resolve_total,
            result_cache_hits,
            result_cache_misses,
            upstream_api_calls,
            upstream_rate_limit_remaining,
            allowlist_refreshes,
            allowlist_refresh_failures,
            store_fallbacks,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Thread-safe wrapper for the metrics registry, used in `AppState`.
#[derive(Clone)]
pub struct MetricsRegistry {
    pub registry: Arc<Registry>,
    pub metrics: Arc<Metrics>,
}

impl MetricsRegistry {
    /// Build a fresh registry and pre-register all service metrics.
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let metrics = Metrics::new(&mut registry);
        Self {
            registry: Arc::new(registry),
            metrics: Arc::new(metrics),
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
