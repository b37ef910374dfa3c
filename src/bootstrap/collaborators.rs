//! What the bootstrap drives
//!
//! The orchestrator only sequences these three; loading, starting the
//! application and telling the user are all behind traits so the retry
//! logic runs the same against HTTP, a terminal, or test doubles.

use crate::error::WarmbootResult;
use crate::model::LoadedModel;
use async_trait::async_trait;

/// Produces the model, possibly from the network
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// One load attempt
    async fn load_model(&self) -> WarmbootResult<LoadedModel>;
}

/// Starts the application around a loaded model
#[async_trait]
pub trait AppInitializer: Send + Sync {
    /// Run once after the model loaded; an error here is not retried
    async fn initialize(&self, model: &LoadedModel) -> WarmbootResult<()>;
}

/// User-facing progress
pub trait StatusSink: Send + Sync {
    /// Transient progress message
    fn report_status(&self, message: &str);

    /// The application is usable
    fn show_ready(&self);

    /// Bootstrap gave up
    fn show_failed(&self, reason: &str);
}
