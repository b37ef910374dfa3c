//! Configuration management for warmboot

pub mod schema;

pub use schema::Config;

use crate::error::{WarmbootError, WarmbootResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("warmboot")
            .join("config.toml")
    }

    /// Whether a config file exists at the managed path
    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }

    /// Load configuration, falling back to defaults if the file is missing
    pub async fn load(&self) -> WarmbootResult<Config> {
        if !self.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> WarmbootResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| WarmbootError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| WarmbootError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Reject a parsed configuration with semantic problems
    pub fn validate(&self, config: &Config) -> WarmbootResult<()> {
        let problems = config.problems();
        if problems.is_empty() {
            return Ok(());
        }

        Err(WarmbootError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: problems.join("; "),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> WarmbootResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            WarmbootError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> WarmbootResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| WarmbootError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
