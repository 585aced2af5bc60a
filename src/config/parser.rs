//! Configuration parser for loading and saving cluster specifications.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, and serializing the specification again once provisioned
//! outputs have been written back into it.

use crate::error::{ClusterIamError, ConfigError, Result};
use std::path::Path;
use tracing::{debug, info};

use super::spec::ClusterConfig;

/// Environment variable overriding `metadata.name`.
pub const ENV_CLUSTER_NAME: &str = "CLUSTERIAM_CLUSTER_NAME";

/// Environment variable overriding `metadata.region`.
pub const ENV_REGION: &str = "CLUSTERIAM_REGION";

/// Configuration parser for loading cluster configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ClusterConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ClusterIamError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ClusterIamError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<ClusterConfig> {
        debug!("Parsing YAML configuration");

        let config: ClusterConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            ClusterIamError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Successfully parsed configuration for cluster: {}", config.metadata.name);
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Recognized variables are [`ENV_CLUSTER_NAME`] and [`ENV_REGION`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<ClusterConfig> {
        let mut config = self.load_file(path)?;

        Self::apply_overrides(&mut config, |key| std::env::var(key).ok());

        Ok(config)
    }

    /// Applies overrides looked up through `lookup`.
    fn apply_overrides(config: &mut ClusterConfig, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup(ENV_CLUSTER_NAME) {
            debug!("Overriding metadata.name from environment");
            config.metadata.name = name;
        }

        if let Some(region) = lookup(ENV_REGION) {
            debug!("Overriding metadata.region from environment");
            config.metadata.region = Some(region);
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                ClusterIamError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Serializes `config` back to YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(config: &ClusterConfig) -> Result<String> {
        serde_yaml::to_string(config).map_err(|e| {
            ClusterIamError::Config(ConfigError::ParseError {
                message: format!("YAML serialization error: {e}"),
                location: None,
            })
        })
    }

    /// Writes `config` to `path` as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save_file(config: &ClusterConfig, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = Self::to_yaml(config)?;
        std::fs::write(path, content)?;
        info!("Wrote configuration to: {}", path.display());
        Ok(())
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["clusteriam.yaml", "clusteriam.yml"];

/// Finds the configuration file in the current directory or parent directories.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(ClusterIamError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}
