//! Error types for the artifact store.

use thiserror::Error;

use super::types::ArtifactId;

/// Errors that can occur in the artifact store.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// No artifact with this id (never existed, or already swept).
    #[error("artifact not found: {0}")]
    NotFound(ArtifactId),

    /// The artifact exists but is past its expiry window.
    #[error("artifact expired: {0}")]
    Expired(ArtifactId),

    /// Upload exceeds the configured size limit.
    #[error("upload of {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    /// I/O error on the backing storage.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}
