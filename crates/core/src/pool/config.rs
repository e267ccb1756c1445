//! Process pool configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the external-engine process pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of worker slots. Each slot is one isolated engine
    /// instance; conversions requiring the engine never exceed this
    /// concurrency.
    #[serde(default = "default_size")]
    pub size: usize,

    /// Maximum number of callers allowed to wait for a worker. Above
    /// this depth new checkouts fail fast instead of queueing.
    #[serde(default = "default_queue_depth")]
    pub checkout_queue_depth: usize,

    /// How long a caller may wait for an idle worker (seconds).
    #[serde(default = "default_checkout_timeout")]
    pub checkout_timeout_secs: u64,

    /// Consecutive spawn failures before the pool is marked unhealthy
    /// and checkouts fail fast.
    #[serde(default = "default_spawn_failure_threshold")]
    pub spawn_failure_threshold: u32,

    /// Delay between respawn attempts after a worker death (ms).
    #[serde(default = "default_respawn_backoff")]
    pub respawn_backoff_ms: u64,

    /// Maximum time drain() waits for busy workers at shutdown before
    /// force-terminating them (seconds).
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_secs: u64,

    /// Path to the office engine binary.
    #[serde(default = "default_soffice_path")]
    pub soffice_path: PathBuf,
}

fn default_size() -> usize {
    3
}

fn default_queue_depth() -> usize {
    16
}

fn default_checkout_timeout() -> u64 {
    30
}

fn default_spawn_failure_threshold() -> u32 {
    3
}

fn default_respawn_backoff() -> u64 {
    1000
}

fn default_drain_timeout() -> u64 {
    20
}

fn default_soffice_path() -> PathBuf {
    PathBuf::from("soffice")
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            checkout_queue_depth: default_queue_depth(),
            checkout_timeout_secs: default_checkout_timeout(),
            spawn_failure_threshold: default_spawn_failure_threshold(),
            respawn_backoff_ms: default_respawn_backoff(),
            drain_timeout_secs: default_drain_timeout(),
            soffice_path: default_soffice_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.size, 3);
        assert_eq!(config.checkout_queue_depth, 16);
        assert_eq!(config.spawn_failure_threshold, 3);
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            size = 1
            checkout_timeout_secs = 5
        "#;
        let config: PoolConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.size, 1);
        assert_eq!(config.checkout_timeout_secs, 5);
        assert_eq!(config.respawn_backoff_ms, 1000);
    }
}
