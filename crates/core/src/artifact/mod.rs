//! Artifact store: lifecycle of every file the service touches.
//!
//! Inputs are staged here, output paths are reserved here before any
//! engine writes to them, and scratch directories for multi-stage
//! conversions are allocated here. A background sweep removes artifacts
//! past their retention window, skipping anything open for read or
//! pinned by a non-terminal job.

mod config;
mod error;
mod store;
mod types;

pub use config::ArtifactConfig;
pub use error::ArtifactError;
pub use store::{ArtifactReadGuard, ArtifactStore};
pub use types::{Artifact, ArtifactId, ArtifactKind};
