//! Engine abstraction and the LibreOffice implementation.
//!
//! The pool is generic over [`Engine`] so tests can run against a mock
//! and the manager never needs to know what binary it is babysitting.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::config::PoolConfig;
use super::error::PoolError;

/// Probe timeout for spawn and health checks.
const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// One prepared engine instance backing a worker slot.
///
/// Holds the instance's private workspace (for LibreOffice, the user
/// profile directory). The directory is removed when the instance is
/// dropped.
#[derive(Debug)]
pub struct WorkerInstance {
    workspace: TempDir,
}

impl WorkerInstance {
    pub fn workspace(&self) -> PathBuf {
        self.workspace.path().to_path_buf()
    }

    /// Instance backed by a throwaway directory, for engines that need
    /// no real workspace (mocks, stateless engines).
    pub fn ephemeral() -> std::io::Result<Self> {
        Ok(Self {
            workspace: tempfile::tempdir()?,
        })
    }
}

/// An external conversion engine managed by the pool.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Name of the engine for logs and diagnostics.
    fn name(&self) -> &str;

    /// Prepares one worker instance and verifies the engine responds.
    async fn spawn(&self, worker_id: usize) -> Result<WorkerInstance, PoolError>;

    /// Cheap liveness probe for an existing instance.
    async fn health_check(&self, instance: &WorkerInstance) -> bool;

    /// Tears an instance down. The default drops it, which removes its
    /// workspace.
    async fn shutdown(&self, instance: WorkerInstance) {
        drop(instance);
    }
}

/// LibreOffice headless engine.
///
/// LibreOffice refuses concurrent instances sharing a user profile, so
/// each worker gets a dedicated profile directory passed via
/// `-env:UserInstallation`. Spawning warms the profile up with a
/// `--version` probe, which also catches a missing binary early.
pub struct SofficeEngine {
    soffice_path: PathBuf,
}

impl SofficeEngine {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            soffice_path: config.soffice_path.clone(),
        }
    }

    /// URI form of a profile directory as soffice expects it.
    pub fn user_installation_arg(workspace: &std::path::Path) -> String {
        format!("-env:UserInstallation=file://{}", workspace.display())
    }

    async fn probe(&self, workspace: &std::path::Path) -> Result<String, String> {
        let result = timeout(
            PROBE_TIMEOUT,
            Command::new(&self.soffice_path)
                .arg("--headless")
                .arg(Self::user_installation_arg(workspace))
                .arg("--version")
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            Ok(Ok(output)) => Err(format!(
                "engine probe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )),
            Ok(Err(e)) => Err(format!("failed to launch {}: {}", self.soffice_path.display(), e)),
            Err(_) => Err(format!("engine probe timed out after {:?}", PROBE_TIMEOUT)),
        }
    }
}

#[async_trait]
impl Engine for SofficeEngine {
    fn name(&self) -> &str {
        "soffice"
    }

    async fn spawn(&self, worker_id: usize) -> Result<WorkerInstance, PoolError> {
        let workspace = tempfile::Builder::new()
            .prefix(&format!("docforge-soffice-{}-", worker_id))
            .tempdir()
            .map_err(|e| PoolError::SpawnFailed {
                reason: format!("failed to create worker profile dir: {}", e),
            })?;

        let version = self
            .probe(workspace.path())
            .await
            .map_err(|reason| PoolError::SpawnFailed { reason })?;
        debug!(worker_id, %version, "office engine worker ready");

        Ok(WorkerInstance { workspace })
    }

    async fn health_check(&self, instance: &WorkerInstance) -> bool {
        self.probe(instance.workspace.path()).await.is_ok()
    }
}
