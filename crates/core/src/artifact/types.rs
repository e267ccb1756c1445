//! Artifact data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Unique identifier of a managed artifact.
///
/// Identifiers are UUIDs and are never reused, so a stale reference can
/// only miss, never alias a different document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId(pub String);

impl ArtifactId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What role an artifact plays in a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Uploaded source document.
    Input,
    /// Final conversion result, exposed for download.
    Output,
    /// Scratch data produced between chain steps.
    Intermediate,
}

/// A file managed by the artifact store.
///
/// The store is the sole owner: no other component deletes or renames
/// the backing file directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub kind: ArtifactKind,
    /// Absolute path of the backing file.
    pub path: PathBuf,
    /// Original client-supplied filename, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Artifact {
    /// Whether the artifact is past its expiry time.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Suggested filename for downloads: the original stem with the
    /// artifact's extension, falling back to the artifact id.
    pub fn download_name(&self) -> String {
        let ext = self
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_string());
        let stem = self
            .original_name
            .as_deref()
            .and_then(|n| std::path::Path::new(n).file_stem().map(|s| s.to_string_lossy().to_string()))
            .unwrap_or_else(|| self.id.0.clone());
        match ext {
            Some(ext) => format!("{}.{}", stem, ext),
            None => stem,
        }
    }
}
