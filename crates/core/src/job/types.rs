//! Conversion job data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::artifact::ArtifactId;
use crate::capability::{CapabilityId, ConversionOptions};
use crate::format::DocumentFormat;

/// Unique job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An accepted conversion request. Immutable once accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// The staged input artifact.
    pub input: ArtifactId,
    pub source: DocumentFormat,
    pub target: DocumentFormat,
    #[serde(default)]
    pub options: ConversionOptions,
}

/// One failed conversion attempt, kept for the job's failure report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptFailure {
    pub capability: CapabilityId,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// Current state of a conversion job.
///
/// State machine flow:
/// ```text
/// Queued -> Running -> Succeeded
///              |
///              +-> Running (next capability in the chain)
///              +-> Failed
///
/// Queued and Running can also transition to Failed or Cancelled.
/// Terminal states never change.
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobState {
    /// Accepted, waiting for the router to pick it up.
    Queued,

    /// A capability is being invoked.
    Running {
        capability: CapabilityId,
        /// 1-based position in the conversion chain.
        attempt: usize,
        started_at: DateTime<Utc>,
    },

    /// Conversion finished; the output artifact is ready for download.
    Succeeded {
        capability: CapabilityId,
        output: ArtifactId,
        completed_at: DateTime<Utc>,
    },

    /// Every applicable capability failed, or the request could not be
    /// served at all.
    Failed {
        error: String,
        failed_at: DateTime<Utc>,
    },

    /// Cancelled before reaching a terminal state.
    Cancelled { cancelled_at: DateTime<Utc> },
}

impl JobState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded { .. } | JobState::Failed { .. } | JobState::Cancelled { .. }
        )
    }

    /// Whether this state may legally become `next`. Job states only
    /// move forward; a Running job may move to another Running state
    /// when the router advances to the next capability.
    pub fn can_transition_to(&self, next: &JobState) -> bool {
        match (self, next) {
            (_, JobState::Queued) => false,
            (JobState::Queued, _) => true,
            (JobState::Running { .. }, _) => true,
            _ => false,
        }
    }

    /// State name for filtering and logs.
    pub fn state_type(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running { .. } => "running",
            JobState::Succeeded { .. } => "succeeded",
            JobState::Failed { .. } => "failed",
            JobState::Cancelled { .. } => "cancelled",
        }
    }
}

/// A tracked conversion job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub request: ConversionRequest,
    pub state: JobState,
    /// One entry per failed capability attempt, in chain order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failure_history: Vec<AttemptFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter for job listings.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    /// Filter by state name (`state_type`).
    pub state: Option<String>,
    /// Maximum number of results, newest first. Zero means no limit.
    pub limit: usize,
}
