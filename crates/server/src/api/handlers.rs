//! Health, config and metrics handlers.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use docforge_core::pool::PoolStatus;
use docforge_core::SanitizedConfig;

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: i64,
    pub pool: PoolStatus,
    pub jobs_tracked: usize,
    pub artifacts_tracked: usize,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let pool = state.pool().status();
    let status = if pool.health.is_healthy() {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse {
        status: status.to_string(),
        uptime_secs: state.uptime_secs(),
        pool,
        jobs_tracked: state.tracker().len(),
        artifacts_tracked: state.store().len(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    collect_dynamic_metrics(&state);
    encode_metrics()
}
