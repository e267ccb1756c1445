//! Mock pool engine for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use crate::pool::{Engine, PoolError, WorkerInstance};

/// Mock implementation of the pool [`Engine`] trait.
///
/// Provides controllable behavior for testing:
/// - Fail the next N spawn attempts
/// - Flip health check results
/// - Count spawns and shutdowns for assertions
pub struct MockEngine {
    healthy: AtomicBool,
    spawn_failures_remaining: AtomicU32,
    spawns: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            spawn_failures_remaining: AtomicU32::new(0),
            spawns: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
        }
    }

    /// Controls the result of subsequent health checks.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Makes the next `count` spawn attempts fail.
    pub fn fail_spawns(&self, count: u32) {
        self.spawn_failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Total spawn attempts, including failed ones.
    pub fn spawn_count(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    /// Instances explicitly shut down by the pool.
    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Engine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn spawn(&self, _worker_id: usize) -> Result<WorkerInstance, PoolError> {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        let remaining = self.spawn_failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.spawn_failures_remaining
                .store(remaining.saturating_sub(1), Ordering::SeqCst);
            return Err(PoolError::SpawnFailed {
                reason: "mock spawn failure".to_string(),
            });
        }
        WorkerInstance::ephemeral().map_err(|e| PoolError::SpawnFailed {
            reason: format!("failed to create mock workspace: {}", e),
        })
    }

    async fn health_check(&self, _instance: &WorkerInstance) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    async fn shutdown(&self, instance: WorkerInstance) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        drop(instance);
    }
}
