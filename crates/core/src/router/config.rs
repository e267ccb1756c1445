//! Fallback router configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::capability::CapabilityId;

/// Configuration for the fallback router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Engine deadline per conversion attempt (seconds).
    #[serde(default = "default_timeout")]
    pub default_timeout_secs: u64,

    /// Per-capability deadline overrides (seconds).
    #[serde(default)]
    pub capability_timeout_secs: HashMap<CapabilityId, u64>,
}

fn default_timeout() -> u64 {
    300
}

impl RouterConfig {
    /// The deadline to apply to one invocation of `capability`.
    pub fn timeout_for(&self, capability: CapabilityId) -> Duration {
        let secs = self
            .capability_timeout_secs
            .get(&capability)
            .copied()
            .unwrap_or(self.default_timeout_secs);
        Duration::from_secs(secs)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout(),
            capability_timeout_secs: HashMap::new(),
        }
    }
}
