//! Supported-format listing.

use axum::{extract::State, Json};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::state::AppState;

/// Response for the formats endpoint: for each source format, the
/// targets it can be converted to.
#[derive(Debug, Serialize)]
pub struct FormatsResponse {
    pub conversions: BTreeMap<String, Vec<String>>,
    pub total_pairs: usize,
}

/// GET /api/v1/formats
pub async fn list_formats(State(state): State<Arc<AppState>>) -> Json<FormatsResponse> {
    let pairs = state.registry().supported_pairs();
    let total_pairs = pairs.len();
    let mut conversions: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (source, target) in pairs {
        conversions
            .entry(source.extension().to_string())
            .or_default()
            .push(target.extension().to_string());
    }
    Json(FormatsResponse {
        conversions,
        total_pairs,
    })
}
