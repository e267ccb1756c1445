//! Service configuration: TOML file plus `DOCFORGE_` environment
//! overrides, merged with figment and validated at startup.

mod loader;
mod types;
mod validate;

pub use loader::{load_config, load_config_from_str};
pub use types::{
    Config, SanitizedConfig, SanitizedPoolConfig, SanitizedRouterConfig, SanitizedStorageConfig,
    ServerConfig,
};
pub use validate::validate_config;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
