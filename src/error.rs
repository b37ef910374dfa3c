//! Error types for warmboot
//!
//! All modules use `WarmbootResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for warmboot operations
pub type WarmbootResult<T> = Result<T, WarmbootError>;

/// All errors that can occur in warmboot
#[derive(Error, Debug)]
pub enum WarmbootError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    // Cache store errors
    #[error("Invalid cache generation id '{0}'")]
    InvalidGeneration(String),

    #[error("Cache generation not found: {0}")]
    GenerationNotFound(String),

    #[error("Corrupt cache entry {path}: {reason}")]
    CacheCorrupt { path: PathBuf, reason: String },

    // Fetch errors
    #[error("Network request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("{url} responded with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("{url} is unreachable and no cached version is available")]
    Unavailable { url: String },

    // Lifecycle errors
    #[error("Lifecycle controller is {actual}, expected {expected}")]
    InvalidPhase {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Failed to cache required resource {resource}: {reason}")]
    ManifestEntry { resource: String, reason: String },

    #[error("No installed cache generation to serve from")]
    NoInstalledGeneration,

    // Bootstrap errors
    #[error("Cannot {action} while bootstrap is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("Model load attempt timed out after {secs}s")]
    AttemptTimeout { secs: u64 },

    #[error("Invalid model document: {0}")]
    ModelFormat(String),

    #[error("Model failed to load after {attempts} attempt(s): {reason}")]
    BootFailed { attempts: u32, reason: String },

    #[error("Application failed to initialize: {0}")]
    Initialization(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl WarmbootError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transport-level network error
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error means the resource could not be reached at all,
    /// as opposed to the server answering with an error status
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Unavailable { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Unavailable { .. } => {
                Some("Connect once and run: warmboot install, so the resource is cached for offline use")
            }
            Self::NoInstalledGeneration => Some("Run: warmboot install while online"),
            Self::BootFailed { .. } => Some("Check the model URL and your connection, then run: warmboot boot"),
            Self::ConfigInvalid { .. } => Some("Run: warmboot config validate"),
            _ => None,
        }
    }
}
