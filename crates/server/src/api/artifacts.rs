//! Artifact download and maintenance handlers.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use docforge_core::artifact::{ArtifactId, ArtifactKind};

use super::error::ApiError;
use crate::state::AppState;

/// GET /api/v1/download/{artifact_id}
///
/// Streams an artifact's bytes with a download filename derived from
/// the original upload. Expired artifacts return 410 until swept, 404
/// after.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(HeaderMap, Vec<u8>), ApiError> {
    let id = ArtifactId(id);
    let (artifact, _guard) = state.store().open(&id)?;
    if artifact.kind == ArtifactKind::Intermediate {
        return Err(ApiError::not_found(format!("artifact not found: {}", id)));
    }

    // The guard keeps the file on disk for the duration of the read.
    let bytes = tokio::fs::read(&artifact.path)
        .await
        .map_err(docforge_core::artifact::ArtifactError::from)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type(
            artifact.path.extension().and_then(|e| e.to_str()).unwrap_or(""),
        )),
    );
    let disposition = format!("attachment; filename=\"{}\"", artifact.download_name());
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    Ok((headers, bytes))
}

/// DELETE /api/v1/artifacts/{id}
///
/// Marks an artifact expired; the file is removed as soon as nothing
/// holds it open.
pub async fn delete_artifact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store().expire(&ArtifactId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Response for cleanup requests
#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub removed: usize,
}

/// POST /api/v1/cleanup
///
/// Runs a retention sweep immediately instead of waiting for the
/// background interval.
pub async fn cleanup(State(state): State<Arc<AppState>>) -> Json<CleanupResponse> {
    let removed = state.store().sweep().await;
    Json(CleanupResponse { removed })
}

fn content_type(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "odp" => "application/vnd.oasis.opendocument.presentation",
        "rtf" => "application/rtf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "html" => "text/html",
        "jpg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tiff" | "tif" => "image/tiff",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
