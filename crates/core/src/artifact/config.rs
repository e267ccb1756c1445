//! Artifact store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the artifact store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Root directory for managed files. Inputs, outputs and scratch
    /// directories live in subdirectories of this path.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// How long staged inputs are kept (hours).
    #[serde(default = "default_input_retention")]
    pub input_retention_hours: u64,

    /// How long conversion outputs are kept for download (hours).
    #[serde(default = "default_output_retention")]
    pub output_retention_hours: u64,

    /// How often the background sweep runs (seconds).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: u64,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_input_retention() -> u64 {
    24
}

fn default_output_retention() -> u64 {
    168 // 7 days
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_max_upload() -> u64 {
    100 * 1024 * 1024 // 100 MB
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            input_retention_hours: default_input_retention(),
            output_retention_hours: default_output_retention(),
            sweep_interval_secs: default_sweep_interval(),
            max_upload_bytes: default_max_upload(),
        }
    }
}
