//! Router configuration.
//!
//! Aggregates the per-area configuration into a single `Config` that can be
//! loaded from YAML files or environment variables.

mod discovery;
mod listen;

pub use discovery::{CacheConfig, DiscoveryConfig, DiscoveryType, StaticInstanceConfig};
pub use listen::{AwsConfig, ListenConfig};

use serde::Deserialize;

use crate::address::DEFAULT_NAMESPACE;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "svcdispatch.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "SVCDISPATCH_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "SVCDISPATCH";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "SVCDISPATCH_LOG";

/// Main configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Namespace applied to addresses without one.
    pub default_namespace: String,
    /// Deployment stage; qualifies registry namespaces as `{ns}-{stage}`.
    pub stage: Option<String>,
    pub discovery: DiscoveryConfig,
    pub listen: ListenConfig,
    pub aws: AwsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            stage: None,
            discovery: DiscoveryConfig::default(),
            listen: ListenConfig::default(),
            aws: AwsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `svcdispatch.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables such as `SVCDISPATCH__LISTEN__MAX_MESSAGES`
    pub fn load(path: Option<&str>) -> Result<Self, ::config::ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
