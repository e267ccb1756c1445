//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the docforge server:
//! - HTTP request metrics (latency, counts, in-flight)
//! - Job and pool gauges (collected dynamically from application state)
//! - Core conversion metrics registered from the core crate

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "docforge_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("docforge_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "docforge_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Job and Pool Gauges (collected dynamically)
// =============================================================================

/// Jobs by current state.
pub static JOBS_BY_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("docforge_jobs_by_state", "Current job count by state"),
        &["state"],
    )
    .unwrap()
});

/// Pool worker slots by state.
pub static POOL_WORKERS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("docforge_pool_workers", "Pool worker slots by state"),
        &["state"],
    )
    .unwrap()
});

/// Tracked artifacts.
pub static ARTIFACTS_TRACKED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "docforge_artifacts_tracked",
        "Number of artifacts tracked by the store",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    registry.register(Box::new(JOBS_BY_STATE.clone())).unwrap();
    registry.register(Box::new(POOL_WORKERS.clone())).unwrap();
    registry
        .register(Box::new(ARTIFACTS_TRACKED.clone()))
        .unwrap();

    // Core metrics (conversion attempts, fallbacks, pool counters)
    for metric in docforge_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the live tracker, pool and
/// store rather than the state at the last mutation.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let tracker = state.tracker();
    for state_type in ["queued", "running", "succeeded", "failed", "cancelled"] {
        let filter = docforge_core::job::JobFilter {
            state: Some(state_type.to_string()),
            ..Default::default()
        };
        JOBS_BY_STATE
            .with_label_values(&[state_type])
            .set(tracker.list(&filter).len() as i64);
    }

    let pool = state.pool().status();
    POOL_WORKERS.with_label_values(&["idle"]).set(pool.idle as i64);
    POOL_WORKERS.with_label_values(&["busy"]).set(pool.busy as i64);
    POOL_WORKERS.with_label_values(&["dead"]).set(pool.dead as i64);

    ARTIFACTS_TRACKED.set(state.store().len() as i64);
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let uuid_regex = regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap();
    uuid_regex.replace_all(path, "{id}").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/jobs/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/jobs/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("docforge_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_core_metrics() {
        docforge_core::metrics::CONVERSION_FALLBACKS.inc();
        let output = encode_metrics();
        assert!(output.contains("docforge_conversion_fallbacks_total"));
    }
}
