//! Configuration management for the API group registry
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (apigroups.toml)
//! - Environment variables (APIGROUPS_*)
//!
//! ## Example config file (apigroups.toml):
//! ```toml
//! [registry]
//! allowed_versions = ["v1", "image.openshift.io/v1"]
//!
//! [logging]
//! filter = "info"
//!
//! [output]
//! format = "pretty"
//! ```
//!
//! From the environment, lists are comma separated:
//! `APIGROUPS__REGISTRY__ALLOWED_VERSIONS=v1,image.openshift.io/v1`

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::VersionParseError;
use crate::version::GroupVersion;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameworkConfig {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Versions that may be enabled; empty allows every version
    #[serde(default)]
    pub allowed_versions: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by RUST_LOG
    #[serde(default = "default_filter")]
    pub filter: String,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl FrameworkConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a required file at `config_path`
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["apigroups.toml", ".apigroups.toml", "config/apigroups.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "apigroups", "registry") {
            let xdg_config = config_dir.config_dir().join("apigroups.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("APIGROUPS")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("registry.allowed_versions")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Parsed allow-list for the registry
    pub fn allowed_versions(&self) -> Result<Vec<GroupVersion>, VersionParseError> {
        self.registry
            .allowed_versions
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(GroupVersion::parse)
            .collect()
    }
}
