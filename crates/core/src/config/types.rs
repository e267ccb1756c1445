use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::artifact::ArtifactConfig;
use crate::capability::EnginesConfig;
use crate::format::RegistryConfig;
use crate::pool::PoolConfig;
use crate::router::RouterConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: ArtifactConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub engines: EnginesConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Sanitized config for API responses. Host-local details (storage
/// root, engine binary paths) are withheld; only the tunables that
/// matter to API clients are reported.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub storage: SanitizedStorageConfig,
    pub pool: SanitizedPoolConfig,
    pub router: SanitizedRouterConfig,
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStorageConfig {
    pub input_retention_hours: u64,
    pub output_retention_hours: u64,
    pub sweep_interval_secs: u64,
    pub max_upload_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPoolConfig {
    pub size: usize,
    pub checkout_queue_depth: usize,
    pub checkout_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedRouterConfig {
    pub default_timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            storage: SanitizedStorageConfig {
                input_retention_hours: config.storage.input_retention_hours,
                output_retention_hours: config.storage.output_retention_hours,
                sweep_interval_secs: config.storage.sweep_interval_secs,
                max_upload_bytes: config.storage.max_upload_bytes,
            },
            pool: SanitizedPoolConfig {
                size: config.pool.size,
                checkout_queue_depth: config.pool.checkout_queue_depth,
                checkout_timeout_secs: config.pool.checkout_timeout_secs,
            },
            router: SanitizedRouterConfig {
                default_timeout_secs: config.router.default_timeout_secs,
            },
            registry: config.registry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.pool.size, 3);
        assert_eq!(config.storage.input_retention_hours, 24);
        assert!(config.registry.prefer_pdf_library);
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[storage]
root_dir = "/var/lib/docforge"
output_retention_hours = 48

[pool]
size = 2
soffice_path = "/usr/bin/soffice"

[router]
default_timeout_secs = 120

[router.capability_timeout_secs]
office_engine = 600

[registry]
prefer_pdf_library = false

[engines]
pandoc_path = "/opt/pandoc/bin/pandoc"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.root_dir, PathBuf::from("/var/lib/docforge"));
        assert_eq!(config.storage.output_retention_hours, 48);
        assert_eq!(config.pool.size, 2);
        assert_eq!(config.pool.soffice_path, PathBuf::from("/usr/bin/soffice"));
        assert_eq!(config.router.default_timeout_secs, 120);
        assert!(!config.registry.prefer_pdf_library);
        assert_eq!(
            config.engines.pandoc_path,
            PathBuf::from("/opt/pandoc/bin/pandoc")
        );
    }

    #[test]
    fn test_sanitized_config_hides_paths() {
        let config = Config::default();
        let sanitized = SanitizedConfig::from(&config);
        let json = serde_json::to_value(&sanitized).unwrap();
        assert_eq!(json["server"]["port"], 8080);
        assert_eq!(json["pool"]["size"], 3);
        assert!(json["storage"].get("root_dir").is_none());
        assert!(json["pool"].get("soffice_path").is_none());
        assert!(json.get("engines").is_none());
    }
}
