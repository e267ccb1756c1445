//! Error types for converter capabilities.

use thiserror::Error;

use crate::format::DocumentFormat;

/// Errors reported by one conversion strategy.
///
/// These are chain-level failures: the fallback router may retry the
/// request with the next capability. Crash-like variants additionally
/// cause the pool worker (if any) to be torn down.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The engine ran and reported failure.
    #[error("engine failed: {reason}")]
    EngineFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// The engine process died abnormally (signal, broken pipe).
    #[error("engine crashed: {reason}")]
    EngineCrashed { reason: String },

    /// The engine did not finish within the per-capability deadline.
    #[error("engine timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The engine exited cleanly but the expected output never appeared.
    #[error("engine produced no output ({expected})")]
    OutputMissing { expected: String },

    /// Invoked for a pair this strategy cannot handle. Indicates a
    /// registry table bug, not a user error.
    #[error("capability cannot convert {source} to {target}")]
    UnsupportedPair {
        source: DocumentFormat,
        target: DocumentFormat,
    },

    /// The capability needs a pooled worker but none was checked out.
    #[error("capability requires a pool worker")]
    WorkerRequired,

    /// Bad per-request options.
    #[error("invalid options: {reason}")]
    InvalidOptions { reason: String },

    /// The invocation was aborted by job cancellation.
    #[error("conversion cancelled")]
    Cancelled,

    /// I/O error moving artifacts around.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CapabilityError {
    pub fn engine_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::EngineFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Whether the worker that served this call should be presumed
    /// broken and torn down rather than returned to the pool.
    pub fn is_worker_crash(&self) -> bool {
        matches!(
            self,
            Self::EngineCrashed { .. } | Self::Timeout { .. } | Self::Cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crash_classification() {
        assert!(CapabilityError::Timeout { timeout_secs: 30 }.is_worker_crash());
        assert!(CapabilityError::EngineCrashed {
            reason: "killed".to_string()
        }
        .is_worker_crash());
        assert!(!CapabilityError::engine_failed("exit 1", None).is_worker_crash());
        assert!(!CapabilityError::OutputMissing {
            expected: "*.docx".to_string()
        }
        .is_worker_crash());
    }
}
