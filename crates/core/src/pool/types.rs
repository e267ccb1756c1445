//! Types for the process pool.

use serde::{Deserialize, Serialize};

/// Lifecycle state of one worker slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Ready for checkout.
    Idle,
    /// Checked out to exactly one job.
    Busy,
    /// Retired during shutdown; will not be handed out again.
    Draining,
    /// Crashed or failed a health check; awaiting respawn.
    Dead,
}

/// How a checked-out worker came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The engine call finished (successfully or not) and the worker is
    /// believed reusable.
    Completed,
    /// The engine crashed, timed out or was abandoned mid-call; the
    /// worker must be torn down and respawned.
    Crashed,
}

/// Aggregate pool health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PoolHealth {
    Healthy,
    /// Respawns failed repeatedly; checkouts fail fast until restart.
    Unhealthy { reason: String },
}

impl PoolHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, PoolHealth::Healthy)
    }
}

/// Snapshot of the pool for status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStatus {
    pub size: usize,
    pub idle: usize,
    pub busy: usize,
    pub dead: usize,
    pub health: PoolHealth,
    pub total_checkouts: u64,
    pub total_checkout_timeouts: u64,
    pub total_crashes: u64,
    pub total_respawns: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_predicates() {
        assert!(PoolHealth::Healthy.is_healthy());
        assert!(!PoolHealth::Unhealthy {
            reason: "engine binary missing".to_string()
        }
        .is_healthy());
    }

    #[test]
    fn test_status_serialization() {
        let status = PoolStatus {
            size: 3,
            idle: 2,
            busy: 1,
            dead: 0,
            health: PoolHealth::Healthy,
            total_checkouts: 10,
            total_checkout_timeouts: 0,
            total_crashes: 1,
            total_respawns: 1,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["health"]["state"], "healthy");
        assert_eq!(json["busy"], 1);
    }
}
