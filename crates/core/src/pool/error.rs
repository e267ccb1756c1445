//! Error types for the process pool.

use thiserror::Error;

/// Errors that can occur when interacting with the pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// No worker became idle before the checkout deadline.
    #[error("no worker available within {waited_secs}s")]
    Timeout { waited_secs: u64 },

    /// Too many callers already waiting; rejected for backpressure.
    #[error("checkout queue full ({depth} waiting)")]
    QueueFull { depth: usize },

    /// The pool gave up respawning workers and is out of service.
    #[error("pool unhealthy: {reason}")]
    Unhealthy { reason: String },

    /// The pool is shutting down and no longer issues checkouts.
    #[error("pool is draining")]
    Draining,

    /// An engine worker could not be spawned.
    #[error("failed to spawn engine worker: {reason}")]
    SpawnFailed { reason: String },
}
