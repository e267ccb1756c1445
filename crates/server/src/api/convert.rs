//! Conversion API handler.

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use docforge_core::capability::{ConversionOptions, Quality};
use docforge_core::format::DocumentFormat;
use docforge_core::job::ConversionRequest;

use super::error::ApiError;
use super::jobs::JobResponse;
use crate::state::AppState;

/// Query parameters for conversion requests
#[derive(Debug, Deserialize)]
pub struct ConvertParams {
    /// Run the conversion inline and return the terminal job.
    #[serde(default)]
    pub sync: bool,
}

/// Parsed multipart form for a conversion request.
#[derive(Default)]
struct ConvertForm {
    file: Option<Vec<u8>>,
    filename: Option<String>,
    target: Option<String>,
    source: Option<String>,
    quality: Option<String>,
    page_range: Option<String>,
    ocr_language: Option<String>,
}

/// POST /api/v1/convert
///
/// Accepts a multipart upload with a `file` part and a `target` format
/// field. The source format comes from an optional `source` field or
/// the uploaded filename's extension. By default the job runs in the
/// background and a 202 with the queued job is returned; with
/// `?sync=true` the handler waits and returns the terminal job.
pub async fn convert(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConvertParams>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<JobResponse>), ApiError> {
    let form = read_form(multipart).await?;

    let bytes = form
        .file
        .ok_or_else(|| ApiError::bad_request("missing 'file' part"))?;
    let target_ext = form
        .target
        .ok_or_else(|| ApiError::bad_request("missing 'target' field"))?;
    let target = DocumentFormat::from_extension(&target_ext)
        .ok_or_else(|| ApiError::bad_request(format!("unknown target format: {:?}", target_ext)))?;

    let source_ext = form
        .source
        .or_else(|| {
            form.filename
                .as_deref()
                .and_then(|name| std::path::Path::new(name).extension())
                .map(|ext| ext.to_string_lossy().to_string())
        })
        .ok_or_else(|| {
            ApiError::bad_request("source format missing: provide a 'source' field or a filename with an extension")
        })?;
    let source = DocumentFormat::from_extension(&source_ext)
        .ok_or_else(|| ApiError::bad_request(format!("unknown source format: {:?}", source_ext)))?;

    let options = ConversionOptions {
        quality: form.quality.as_deref().map(parse_quality).transpose()?,
        page_range: form.page_range,
        ocr_language: form.ocr_language,
        ..Default::default()
    };

    // Reject unsupported pairs before staging the upload.
    if !state.registry().is_supported(source, target) {
        return Err(docforge_core::router::RouterError::NotSupported { source, target }.into());
    }

    let input = state
        .store()
        .stage(&bytes, form.filename, source.extension())
        .await?;

    let request = ConversionRequest {
        input: input.id,
        source,
        target,
        options,
    };

    if params.sync {
        let job = state.router().execute(request).await?;
        Ok((StatusCode::OK, Json(JobResponse::from(job))))
    } else {
        let job = state.router().submit(request)?;
        Ok((StatusCode::ACCEPTED, Json(JobResponse::from(job))))
    }
}

async fn read_form(mut multipart: Multipart) -> Result<ConvertForm, ApiError> {
    let mut form = ConvertForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                form.filename = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read file: {}", e)))?;
                form.file = Some(bytes.to_vec());
            }
            "target" => form.target = read_text(field).await?,
            "source" => form.source = read_text(field).await?,
            "quality" => form.quality = read_text(field).await?,
            "page_range" => form.page_range = read_text(field).await?,
            "ocr_language" => form.ocr_language = read_text(field).await?,
            _ => {}
        }
    }
    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<Option<String>, ApiError> {
    let text = field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid form field: {}", e)))?;
    Ok(if text.is_empty() { None } else { Some(text) })
}

fn parse_quality(text: &str) -> Result<Quality, ApiError> {
    match text {
        "high" => Ok(Quality::High),
        "medium" => Ok(Quality::Medium),
        "low" => Ok(Quality::Low),
        other => Err(ApiError::bad_request(format!(
            "unknown quality: {:?} (expected high, medium or low)",
            other
        ))),
    }
}
