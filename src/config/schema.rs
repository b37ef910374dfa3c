//! Configuration schema for warmboot
//!
//! Configuration is stored at `~/.config/warmboot/config.toml`

use crate::bootstrap::RetryPolicy;
use crate::cache::GenerationId;
use crate::error::WarmbootResult;
use crate::fetch::Origin;
use crate::lifecycle::ResourceManifest;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Application origin
    pub origin: OriginConfig,

    /// Cache store settings
    pub cache: CacheConfig,

    /// Resources installed into each generation
    pub manifest: ManifestConfig,

    /// Model bootstrap settings
    pub bootstrap: BootstrapConfig,

    /// HTTP client settings
    pub network: NetworkConfig,
}

impl Config {
    /// Parsed application origin
    pub fn origin(&self) -> WarmbootResult<Origin> {
        Origin::parse(&self.origin.base_url)
    }

    pub fn manifest(&self) -> ResourceManifest {
        ResourceManifest::new(
            self.manifest.static_paths.iter().cloned(),
            self.manifest.external_urls.iter().cloned(),
        )
    }

    /// Generation this configuration installs
    pub fn generation_id(&self) -> WarmbootResult<GenerationId> {
        self.manifest()
            .generation_id(&self.cache.prefix, self.cache.version.as_deref())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let timeout = self.bootstrap.attempt_timeout_secs;
        RetryPolicy {
            max_attempts: self.bootstrap.max_attempts,
            backoff_base: Duration::from_millis(self.bootstrap.backoff_base_ms),
            attempt_timeout: (timeout > 0).then(|| Duration::from_secs(timeout)),
        }
    }

    /// Semantic problems a successful parse cannot catch
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            problems.push(format!(
                "general.log_format must be \"text\" or \"json\", got \"{}\"",
                self.general.log_format
            ));
        }

        match self.origin() {
            Ok(origin) => {
                if let Err(e) = self.manifest().static_requests(&origin) {
                    problems.push(format!("manifest.static_paths: {}", e));
                }
                if let Err(e) = self.manifest().external_requests(&origin) {
                    problems.push(format!("manifest.external_urls: {}", e));
                }
            }
            Err(e) => problems.push(format!("origin.base_url: {}", e)),
        }

        if let Err(e) = self.generation_id() {
            problems.push(format!("cache: {}", e));
        }

        if self.bootstrap.max_attempts == 0 {
            problems.push("bootstrap.max_attempts must be at least 1".to_string());
        }
        if self.bootstrap.model_url.trim().is_empty() {
            problems.push("bootstrap.model_url must not be empty".to_string());
        }
        if self.network.timeout_secs == 0 {
            problems.push("network.timeout_secs must be at least 1".to_string());
        }
        if self.network.max_body_mb == 0 {
            problems.push("network.max_body_mb must be at least 1".to_string());
        }

        problems
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Base URL relative resources resolve against
    pub base_url: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

/// Cache store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Store root (defaults to the platform cache directory)
    pub dir: Option<PathBuf>,

    /// Generation name prefix
    pub prefix: String,

    /// Explicit version; when unset the generation is named after a hash
    /// of the manifest
    pub version: Option<String>,
}

impl CacheConfig {
    /// Effective store root
    pub fn root(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("warmboot")
        })
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            prefix: "digit-recognizer".to_string(),
            version: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Same-origin shell resources; install fails if any is missing
    pub static_paths: Vec<String>,

    /// Cross-origin resources cached on a best-effort basis
    pub external_urls: Vec<String>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            static_paths: vec!["/shell.html".to_string(), "/app.bundle.js".to_string()],
            external_urls: vec![],
        }
    }
}

/// Model bootstrap configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Layers-model document, relative to the origin or absolute
    pub model_url: String,

    /// Load attempts before giving up
    pub max_attempts: u32,

    /// Wait before the second attempt, doubled for each later one
    pub backoff_base_ms: u64,

    /// Per-attempt limit in seconds (0 = none)
    pub attempt_timeout_secs: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            model_url: "/model/model.json".to_string(),
            max_attempts: 3,
            backoff_base_ms: 1000,
            attempt_timeout_secs: 30,
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// Largest accepted response body in MiB
    pub max_body_mb: u64,
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn max_body_bytes(&self) -> u64 {
        self.max_body_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_body_mb: 256,
        }
    }
}
