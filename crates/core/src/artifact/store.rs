//! Filesystem-backed artifact store.
//!
//! The store is the single owner of every temporary file the service
//! creates: staged uploads, reserved output paths and per-attempt
//! scratch directories. Everything else holds `ArtifactId`s and asks
//! the store for access, so no two components can race on a path.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::metrics;

use super::config::ArtifactConfig;
use super::error::ArtifactError;
use super::types::{Artifact, ArtifactId, ArtifactKind};

/// Bookkeeping for one artifact.
struct Record {
    artifact: Artifact,
    /// Live read guards. Sweep never removes an artifact with readers.
    readers: usize,
    /// Pins held by non-terminal jobs referencing this artifact.
    pins: usize,
    /// Set by an explicit `expire` call.
    expired: bool,
}

/// Filesystem-backed store for inputs, outputs and scratch directories.
pub struct ArtifactStore {
    config: ArtifactConfig,
    inner: Mutex<HashMap<ArtifactId, Record>>,
}

/// Guard returned by [`ArtifactStore::open`]. The backing file is kept
/// on disk for as long as the guard is alive.
pub struct ArtifactReadGuard {
    store: Arc<ArtifactStore>,
    id: ArtifactId,
}

impl std::fmt::Debug for ArtifactReadGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactReadGuard")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Drop for ArtifactReadGuard {
    fn drop(&mut self) {
        let mut inner = self.store.inner.lock().expect("artifact store lock poisoned");
        if let Some(record) = inner.get_mut(&self.id) {
            record.readers = record.readers.saturating_sub(1);
        }
    }
}

impl ArtifactStore {
    /// Creates the store, its directory layout, and clears scratch
    /// directories orphaned by a previous crash.
    pub fn new(config: ArtifactConfig) -> Result<Self, ArtifactError> {
        for sub in ["input", "output", "work"] {
            std::fs::create_dir_all(config.root_dir.join(sub))?;
        }
        // Scratch dirs are only meaningful to the process that made them.
        let work = config.root_dir.join("work");
        if let Ok(entries) = std::fs::read_dir(&work) {
            for entry in entries.flatten() {
                let _ = std::fs::remove_dir_all(entry.path());
            }
        }

        Ok(Self {
            config,
            inner: Mutex::new(HashMap::new()),
        })
    }

    /// Stages uploaded bytes as an input artifact.
    pub async fn stage(
        &self,
        bytes: &[u8],
        original_name: Option<String>,
        extension: &str,
    ) -> Result<Artifact, ArtifactError> {
        let limit = self.config.max_upload_bytes;
        if bytes.len() as u64 > limit {
            return Err(ArtifactError::TooLarge {
                size: bytes.len() as u64,
                limit,
            });
        }

        let id = ArtifactId::generate();
        let path = self
            .config
            .root_dir
            .join("input")
            .join(format!("{}.{}", id, extension));
        tokio::fs::write(&path, bytes).await?;

        let artifact = self.register(
            id,
            ArtifactKind::Input,
            path,
            original_name,
            Duration::hours(self.config.input_retention_hours as i64),
        );
        debug!(artifact = %artifact.id, size = bytes.len(), "staged input artifact");
        Ok(artifact)
    }

    /// Reserves a unique output path before a capability writes to it.
    /// No file exists until the capability produces one.
    pub fn allocate_output(&self, extension: &str) -> Artifact {
        let id = ArtifactId::generate();
        let path = self
            .config
            .root_dir
            .join("output")
            .join(format!("{}.{}", id, extension));
        self.register(
            id,
            ArtifactKind::Output,
            path,
            None,
            Duration::hours(self.config.output_retention_hours as i64),
        )
    }

    /// Allocates a scratch directory for one conversion attempt.
    /// Removed explicitly by the caller, or by the sweep if the owning
    /// job crashed.
    pub async fn allocate_scratch(&self) -> Result<Artifact, ArtifactError> {
        let id = ArtifactId::generate();
        let path = self.config.root_dir.join("work").join(id.as_str());
        tokio::fs::create_dir_all(&path).await?;
        Ok(self.register(
            id,
            ArtifactKind::Intermediate,
            path,
            None,
            Duration::hours(self.config.input_retention_hours as i64),
        ))
    }

    fn register(
        &self,
        id: ArtifactId,
        kind: ArtifactKind,
        path: PathBuf,
        original_name: Option<String>,
        retention: Duration,
    ) -> Artifact {
        let now = Utc::now();
        let artifact = Artifact {
            id: id.clone(),
            kind,
            path,
            original_name,
            created_at: now,
            expires_at: now + retention,
        };
        let mut inner = self.inner.lock().expect("artifact store lock poisoned");
        inner.insert(
            id,
            Record {
                artifact: artifact.clone(),
                readers: 0,
                pins: 0,
                expired: false,
            },
        );
        artifact
    }

    /// Looks up artifact metadata without opening it.
    pub fn get(&self, id: &ArtifactId) -> Option<Artifact> {
        let inner = self.inner.lock().expect("artifact store lock poisoned");
        inner.get(id).map(|r| r.artifact.clone())
    }

    /// Opens an artifact for reading. The returned guard keeps the file
    /// on disk until dropped.
    pub fn open(
        self: &Arc<Self>,
        id: &ArtifactId,
    ) -> Result<(Artifact, ArtifactReadGuard), ArtifactError> {
        let mut inner = self.inner.lock().expect("artifact store lock poisoned");
        let record = inner
            .get_mut(id)
            .ok_or_else(|| ArtifactError::NotFound(id.clone()))?;
        if record.expired {
            return Err(ArtifactError::Expired(id.clone()));
        }
        if record.artifact.is_expired(Utc::now()) {
            // Past its window but not yet swept: callers see the same
            // outcome as after the sweep.
            return Err(ArtifactError::NotFound(id.clone()));
        }
        record.readers += 1;
        Ok((
            record.artifact.clone(),
            ArtifactReadGuard {
                store: Arc::clone(self),
                id: id.clone(),
            },
        ))
    }

    /// Marks an artifact expired. The file is removed by the next sweep
    /// (or immediately if nothing holds it open).
    pub async fn expire(&self, id: &ArtifactId) -> Result<(), ArtifactError> {
        let removable = {
            let mut inner = self.inner.lock().expect("artifact store lock poisoned");
            let record = inner
                .get_mut(id)
                .ok_or_else(|| ArtifactError::NotFound(id.clone()))?;
            record.expired = true;
            record.readers == 0 && record.pins == 0
        };
        if removable {
            self.sweep().await;
        }
        Ok(())
    }

    /// Removes an artifact now if unreferenced, otherwise marks it for
    /// the next sweep. Used to discard partial outputs after a failed
    /// capability attempt.
    pub async fn remove(&self, id: &ArtifactId) -> Result<(), ArtifactError> {
        self.expire(id).await
    }

    /// Pins an artifact so the sweep skips it while a job references it.
    pub fn pin(&self, id: &ArtifactId) {
        let mut inner = self.inner.lock().expect("artifact store lock poisoned");
        if let Some(record) = inner.get_mut(id) {
            record.pins += 1;
        }
    }

    /// Releases a pin taken with [`pin`](Self::pin).
    pub fn unpin(&self, id: &ArtifactId) {
        let mut inner = self.inner.lock().expect("artifact store lock poisoned");
        if let Some(record) = inner.get_mut(id) {
            record.pins = record.pins.saturating_sub(1);
        }
    }

    /// Removes expired and explicitly-discarded artifacts that nothing
    /// holds open or pinned. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let now = Utc::now();
        let victims: Vec<Artifact> = {
            let mut inner = self.inner.lock().expect("artifact store lock poisoned");
            let ids: Vec<ArtifactId> = inner
                .iter()
                .filter(|(_, r)| {
                    r.readers == 0 && r.pins == 0 && (r.expired || r.artifact.is_expired(now))
                })
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| inner.remove(&id).map(|r| r.artifact))
                .collect()
        };

        let count = victims.len();
        for artifact in victims {
            let result = match artifact.kind {
                ArtifactKind::Intermediate => tokio::fs::remove_dir_all(&artifact.path).await,
                _ => tokio::fs::remove_file(&artifact.path).await,
            };
            match result {
                Ok(()) => debug!(artifact = %artifact.id, "swept artifact"),
                // Outputs may never have been written; nothing to do.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(artifact = %artifact.id, "failed to remove artifact: {}", e),
            }
        }
        if count > 0 {
            metrics::ARTIFACTS_SWEPT.inc_by(count as u64);
        }
        count
    }

    /// Spawns the background sweep loop. Send on the returned channel
    /// to stop it.
    pub fn spawn_sweeper(self: &Arc<Self>) -> (JoinHandle<()>, watch::Sender<bool>) {
        let store = Arc::clone(self);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let interval = std::time::Duration::from_secs(self.config.sweep_interval_secs);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = store.sweep().await;
                        if removed > 0 {
                            info!(removed, "artifact sweep");
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        (handle, shutdown_tx)
    }

    /// Number of tracked artifacts (for status endpoints and tests).
    pub fn len(&self) -> usize {
        self.inner.lock().expect("artifact store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &std::path::Path) -> Arc<ArtifactStore> {
        Arc::new(
            ArtifactStore::new(ArtifactConfig {
                root_dir: dir.to_path_buf(),
                ..Default::default()
            })
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_stage_and_open_returns_original_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let artifact = store
            .stage(b"hello document", Some("a.txt".to_string()), "txt")
            .await
            .unwrap();
        let (opened, _guard) = store.open(&artifact.id).unwrap();
        let bytes = tokio::fs::read(&opened.path).await.unwrap();
        assert_eq!(bytes, b"hello document");
    }

    #[tokio::test]
    async fn test_stage_rejects_oversized_upload() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            ArtifactStore::new(ArtifactConfig {
                root_dir: dir.path().to_path_buf(),
                max_upload_bytes: 4,
                ..Default::default()
            })
            .unwrap(),
        );
        let err = store.stage(b"too big", None, "txt").await.unwrap_err();
        assert!(matches!(err, ArtifactError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn test_open_unknown_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let err = store.open(&ArtifactId::generate()).unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_explicit_expire_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let artifact = store.stage(b"x", None, "txt").await.unwrap();
        store.expire(&artifact.id).await.unwrap();
        // Sweep ran inline (no readers), so the artifact is gone.
        let err = store.open(&artifact.id).unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound(_)));
        assert!(!artifact.path.exists());
    }

    #[tokio::test]
    async fn test_sweep_skips_open_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let artifact = store.stage(b"x", None, "txt").await.unwrap();

        let (_, guard) = store.open(&artifact.id).unwrap();
        store.expire(&artifact.id).await.unwrap();
        assert!(artifact.path.exists(), "open artifact must not be removed");

        drop(guard);
        store.sweep().await;
        assert!(!artifact.path.exists());
    }

    #[tokio::test]
    async fn test_sweep_skips_pinned_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let artifact = store.stage(b"x", None, "txt").await.unwrap();

        store.pin(&artifact.id);
        store.expire(&artifact.id).await.unwrap();
        assert!(artifact.path.exists());

        store.unpin(&artifact.id);
        store.sweep().await;
        assert!(!artifact.path.exists());
    }

    #[tokio::test]
    async fn test_time_based_expiry_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let artifact = store.stage(b"x", None, "txt").await.unwrap();

        // Force the window into the past.
        {
            let mut inner = store.inner.lock().unwrap();
            inner.get_mut(&artifact.id).unwrap().artifact.expires_at =
                Utc::now() - Duration::seconds(1);
        }
        let err = store.open(&artifact.id).unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound(_)));

        store.sweep().await;
        assert!(!artifact.path.exists());
    }

    #[tokio::test]
    async fn test_scratch_dir_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let scratch = store.allocate_scratch().await.unwrap();
        assert!(scratch.path.is_dir());
        tokio::fs::write(scratch.path.join("stage.pdf"), b"pdf").await.unwrap();

        store.remove(&scratch.id).await.unwrap();
        assert!(!scratch.path.exists());
    }

    #[tokio::test]
    async fn test_allocate_output_paths_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let a = store.allocate_output("docx");
        let b = store.allocate_output("docx");
        assert_ne!(a.path, b.path);
        assert_ne!(a.id, b.id);
    }
}
