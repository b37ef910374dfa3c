//! Cache generation identity and metadata
//!
//! A generation names one versioned instance of the cached resource set.
//! Ids come from a deployed version string or, failing that, from a hash of
//! the resource manifest. Same manifest = same generation.

use crate::error::{WarmbootError, WarmbootResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

const MAX_ID_LEN: usize = 128;

/// Identifier of one cache generation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GenerationId(String);

impl GenerationId {
    /// Validate and wrap a raw id.
    ///
    /// Ids become directory names, so only `[A-Za-z0-9._-]` is accepted and
    /// a leading `.` (reserved for scratch files) is refused.
    pub fn new(id: impl Into<String>) -> WarmbootResult<Self> {
        let id = id.into();
        let valid_chars = id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

        if id.is_empty() || id.len() > MAX_ID_LEN || id.starts_with('.') || !valid_chars {
            return Err(WarmbootError::InvalidGeneration(id));
        }
        Ok(Self(id))
    }

    /// Generation for an explicitly deployed version: `{prefix}-{version}`
    pub fn from_version(prefix: &str, version: &str) -> WarmbootResult<Self> {
        Self::new(format!("{}-{}", prefix, version))
    }

    /// Generation derived from manifest contents: `{prefix}-{hash}`
    ///
    /// The hash is SHA256 over every resource in order, first 12 hex chars.
    pub fn from_resources<'a>(
        prefix: &str,
        resources: impl IntoIterator<Item = &'a str>,
    ) -> WarmbootResult<Self> {
        let mut hasher = Sha256::new();
        for resource in resources {
            hasher.update(resource.as_bytes());
            hasher.update(b"\n");
        }
        let result = hasher.finalize();
        Self::new(format!("{}-{}", prefix, hex::encode(&result[..6])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for GenerationId {
    type Error = WarmbootError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GenerationId> for String {
    fn from(id: GenerationId) -> Self {
        id.0
    }
}

/// Install state of a generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationState {
    /// Created, install still running or interrupted
    Building,
    /// Every required resource was stored
    Complete,
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Building => write!(f, "building"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Persisted metadata of a generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationInfo {
    pub id: GenerationId,
    pub state: GenerationState,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl GenerationInfo {
    /// Metadata for a freshly created generation
    pub fn new(id: GenerationId) -> Self {
        Self {
            id,
            state: GenerationState::Building,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == GenerationState::Complete
    }

    /// Record that install finished
    pub fn complete(mut self) -> Self {
        self.state = GenerationState::Complete;
        self.completed_at = Some(Utc::now());
        self
    }
}

/// Format bytes as human-readable size (e.g., "1.5 MB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
