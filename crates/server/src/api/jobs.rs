//! Job API handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use docforge_core::job::{AttemptFailure, Job, JobFilter, JobId, JobState};

use super::error::ApiError;
use crate::state::AppState;

/// Maximum allowed limit for job queries
const MAX_LIMIT: usize = 1000;

/// Default limit for job queries
const DEFAULT_LIMIT: usize = 100;

/// Query parameters for listing jobs
#[derive(Debug, Deserialize)]
pub struct ListJobsParams {
    /// Filter by state type
    pub state: Option<String>,
    /// Maximum number of jobs to return
    pub limit: Option<usize>,
}

/// Response for job operations
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: String,
    pub input: String,
    pub source: String,
    pub target: String,
    pub state: JobState,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failure_history: Vec<AttemptFailure>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id.to_string(),
            input: job.request.input.to_string(),
            source: job.request.source.to_string(),
            target: job.request.target.to_string(),
            state: job.state,
            failure_history: job.failure_history,
            created_at: job.created_at.to_rfc3339(),
            updated_at: job.updated_at.to_rfc3339(),
        }
    }
}

/// Response for listing jobs
#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobResponse>,
    pub total: usize,
}

/// List jobs with optional filters
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListJobsParams>,
) -> Json<ListJobsResponse> {
    let filter = JobFilter {
        state: params.state,
        limit: params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
    };
    let jobs = state.tracker().list(&filter);
    Json(ListJobsResponse {
        total: jobs.len(),
        jobs: jobs.into_iter().map(JobResponse::from).collect(),
    })
}

/// Get a job by ID
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state.tracker().get(&JobId(id))?;
    Ok(Json(JobResponse::from(job)))
}

/// Cancel a job (DELETE endpoint)
///
/// Queued jobs finalize immediately; running jobs are interrupted and
/// finalize shortly after. Terminal jobs return 409.
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state.tracker().cancel(&JobId(id))?;
    Ok(Json(JobResponse::from(job)))
}
