pub mod artifact;
pub mod capability;
pub mod config;
pub mod format;
pub mod job;
pub mod metrics;
pub mod pool;
pub mod router;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
