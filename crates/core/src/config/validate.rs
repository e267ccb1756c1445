use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Pool has at least one worker slot
/// - Retention and sweep periods are non-zero
/// - Upload limit is non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.pool.size == 0 {
        return Err(ConfigError::ValidationError(
            "pool.size must be at least 1".to_string(),
        ));
    }
    if config.pool.checkout_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "pool.checkout_timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.storage.input_retention_hours == 0 || config.storage.output_retention_hours == 0 {
        return Err(ConfigError::ValidationError(
            "storage retention periods cannot be 0".to_string(),
        ));
    }
    if config.storage.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "storage.sweep_interval_secs cannot be 0".to_string(),
        ));
    }
    if config.storage.max_upload_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "storage.max_upload_bytes cannot be 0".to_string(),
        ));
    }

    if config.router.default_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "router.default_timeout_secs cannot be 0".to_string(),
        ));
    }
    if let Some((capability, _)) = config
        .router
        .capability_timeout_secs
        .iter()
        .find(|(_, secs)| **secs == 0)
    {
        return Err(ConfigError::ValidationError(format!(
            "router.capability_timeout_secs.{} cannot be 0",
            capability
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityId;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(matches!(
            validate_config(&config).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_validate_empty_pool_fails() {
        let mut config = Config::default();
        config.pool.size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_retention_fails() {
        let mut config = Config::default();
        config.storage.output_retention_hours = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_capability_timeout_fails() {
        let mut config = Config::default();
        config
            .router
            .capability_timeout_secs
            .insert(CapabilityId::Pandoc, 0);
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("pandoc"));
    }
}
