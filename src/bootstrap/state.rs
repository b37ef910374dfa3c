//! Bootstrap states and failure classes

use crate::error::WarmbootError;
use std::fmt;

/// Where the bootstrap currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootState {
    Idle,
    LoadingModel,
    RetryPending,
    Ready,
    Failed,
}

impl BootState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::LoadingModel => "loading-model",
            Self::RetryPending => "retry-pending",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for BootState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a run ended in `Failed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootFailure {
    /// Every attempt to load the model failed
    ModelLoad { attempts: u32, reason: String },
    /// The model loaded but the application could not start; never retried
    Initialization { reason: String },
}

impl BootFailure {
    pub fn reason(&self) -> &str {
        match self {
            Self::ModelLoad { reason, .. } | Self::Initialization { reason } => reason,
        }
    }
}

impl From<&BootFailure> for WarmbootError {
    fn from(failure: &BootFailure) -> Self {
        match failure {
            BootFailure::ModelLoad { attempts, reason } => WarmbootError::BootFailed {
                attempts: *attempts,
                reason: reason.clone(),
            },
            BootFailure::Initialization { reason } => WarmbootError::Initialization(reason.clone()),
        }
    }
}
