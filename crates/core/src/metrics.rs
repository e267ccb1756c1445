//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Fallback router (conversion attempts, durations, fallbacks, jobs)
//! - Process pool (checkouts, crashes, respawns)
//! - Artifact store (sweeps)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Conversion attempts total by capability and result.
pub static CONVERSION_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "docforge_conversion_attempts_total",
            "Total conversion attempts",
        ),
        &["capability", "result"], // result: "success", "failed", "cancelled"
    )
    .unwrap()
});

/// Conversion attempt duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "docforge_conversion_duration_seconds",
            "Duration of conversion attempts",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["capability"],
    )
    .unwrap()
});

/// Fallbacks to a lower-priority capability.
pub static CONVERSION_FALLBACKS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "docforge_conversion_fallbacks_total",
        "Total fallbacks to the next capability in a chain",
    )
    .unwrap()
});

/// Jobs reaching a terminal state, by state.
pub static JOBS_COMPLETED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "docforge_jobs_completed_total",
            "Total jobs reaching a terminal state",
        ),
        &["state"], // "succeeded", "failed", "cancelled"
    )
    .unwrap()
});

// =============================================================================
// Pool Metrics
// =============================================================================

/// Pool checkouts total by result.
pub static POOL_CHECKOUTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("docforge_pool_checkouts_total", "Total worker checkouts"),
        &["result"], // "ok", "timeout", "rejected"
    )
    .unwrap()
});

/// Worker crashes detected on release.
pub static POOL_WORKER_CRASHES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "docforge_pool_worker_crashes_total",
        "Total pool worker crashes",
    )
    .unwrap()
});

/// Workers respawned after a crash.
pub static POOL_RESPAWNS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "docforge_pool_respawns_total",
        "Total pool worker respawns",
    )
    .unwrap()
});

// =============================================================================
// Artifact Metrics
// =============================================================================

/// Artifacts removed by the retention sweep.
pub static ARTIFACTS_SWEPT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "docforge_artifacts_swept_total",
        "Total artifacts removed by retention sweeps",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Conversions
        Box::new(CONVERSION_ATTEMPTS.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(CONVERSION_FALLBACKS.clone()),
        Box::new(JOBS_COMPLETED.clone()),
        // Pool
        Box::new(POOL_CHECKOUTS.clone()),
        Box::new(POOL_WORKER_CRASHES.clone()),
        Box::new(POOL_RESPAWNS.clone()),
        // Artifacts
        Box::new(ARTIFACTS_SWEPT.clone()),
    ]
}
