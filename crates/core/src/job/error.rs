//! Job tracker errors.

use thiserror::Error;

use super::types::JobId;

/// Errors from job tracker operations.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job not found: {0}")]
    NotFound(JobId),

    /// The requested state change would move the job backwards or out
    /// of a terminal state.
    #[error("job {id}: illegal transition from {from} to {to}")]
    IllegalTransition {
        id: JobId,
        from: &'static str,
        to: &'static str,
    },
}
