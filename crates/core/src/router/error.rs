//! Router-level errors.

use thiserror::Error;

use crate::artifact::ArtifactError;
use crate::format::DocumentFormat;
use crate::job::JobError;

/// Errors surfaced to callers of the fallback router.
///
/// Chain-internal capability failures never appear here directly; they
/// accumulate in the job's failure history and collapse into
/// `ChainExhausted` when every strategy has been tried.
#[derive(Debug, Error)]
pub enum RouterError {
    /// No capability chain is registered for the pair. Rejected before
    /// any artifact or job is allocated.
    #[error("conversion from {source} to {target} is not supported")]
    NotSupported {
        source: DocumentFormat,
        target: DocumentFormat,
    },

    /// The worker pool cannot serve checkouts.
    #[error("worker pool unavailable: {reason}")]
    PoolUnhealthy { reason: String },

    /// Too many requests already waiting for a worker.
    #[error("conversion queue is full")]
    QueueFull,

    /// Every capability in the chain failed.
    #[error("all {attempts} conversion strategies failed")]
    ChainExhausted { attempts: usize },

    /// The job was cancelled before completing.
    #[error("job cancelled")]
    Cancelled,

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Job(#[from] JobError),
}
