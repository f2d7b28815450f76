// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, HistogramVec, GaugeVec, Opts, Registry, TextEncoder, Encoder,
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
    register_gauge_vec_with_registry,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // FETCH METRICS
    // ============================================================================

    /// Intercepted fetch events by classification
    pub static ref FETCH_EVENTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("fetch_events_total", "Total intercepted fetch events"),
        &["classification"], // bypass, same_origin, trusted_external, untrusted_external, uncontrolled
        REGISTRY
    ).unwrap();

    /// Responses produced by the strategy engine, by where they came from
    pub static ref RESPONSES: CounterVec = register_counter_vec_with_registry!(
        Opts::new("strategy_responses_total", "Responses served by the strategy engine"),
        &["strategy", "source"], // source: network, cache, app_shell, offline
        REGISTRY
    ).unwrap();

    /// Strategy handling duration
    pub static ref STRATEGY_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("strategy_duration_seconds", "Time to produce a response")
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["strategy"],
        REGISTRY
    ).unwrap();

    /// Background revalidation outcomes
    pub static ref REVALIDATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("revalidations_total", "Background revalidation results"),
        &["outcome"], // updated, discarded
        REGISTRY
    ).unwrap();

    // ============================================================================
    // LIFECYCLE METRICS
    // ============================================================================

    /// Install/activate events
    pub static ref LIFECYCLE_EVENTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("lifecycle_events_total", "Total lifecycle events"),
        &["event", "status"], // event: install, activate; status: success, failure
        REGISTRY
    ).unwrap();

    /// Precache fetch results
    pub static ref PRECACHE_FETCHES: CounterVec = register_counter_vec_with_registry!(
        Opts::new("precache_fetches_total", "Precache manifest fetches"),
        &["status"], // ok, failed
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Current generations and entries
    pub static ref CACHE_ENTRIES: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("cache_entries_current", "Current number of cache entries per generation"),
        &["generation"],
        REGISTRY
    ).unwrap();
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        FETCH_EVENTS.with_label_values(&["same_origin"]).inc();
        LIFECYCLE_EVENTS.with_label_values(&["install", "success"]).inc();
        let metrics = gather_metrics();
        assert!(metrics.contains("fetch_events_total"));
        assert!(metrics.contains("lifecycle_events_total"));
    }
}
