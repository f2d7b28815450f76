// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics,
    FETCH_EVENTS,
    RESPONSES,
    STRATEGY_DURATION,
    REVALIDATIONS,
    LIFECYCLE_EVENTS,
    PRECACHE_FETCHES,
    CACHE_ENTRIES,
};

use crate::cache::CacheStats;

/// Helper to record a classified fetch event
pub fn record_fetch_event(classification: &str) {
    FETCH_EVENTS.with_label_values(&[classification]).inc();
}

/// Helper to record a strategy response
pub fn record_response(strategy: &str, source: &str, duration_secs: f64) {
    RESPONSES.with_label_values(&[strategy, source]).inc();
    STRATEGY_DURATION
        .with_label_values(&[strategy])
        .observe(duration_secs);
}

/// Helper to record a background revalidation outcome
pub fn record_revalidation(updated: bool) {
    let outcome = if updated { "updated" } else { "discarded" };
    REVALIDATIONS.with_label_values(&[outcome]).inc();
}

/// Helper to record lifecycle events
pub fn record_lifecycle(event: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    LIFECYCLE_EVENTS.with_label_values(&[event, status]).inc();
}

pub fn record_precache_fetch(ok: bool) {
    let status = if ok { "ok" } else { "failed" };
    PRECACHE_FETCHES.with_label_values(&[status]).inc();
}

/// Replace the per-generation entry gauges with the current store contents
pub fn update_cache_entries(stats: &CacheStats) {
    CACHE_ENTRIES.reset();
    for generation in &stats.generations {
        CACHE_ENTRIES
            .with_label_values(&[&generation.name])
            .set(generation.entries as f64);
    }
}
