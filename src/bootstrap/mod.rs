//! Application bootstrap
//!
//! Loads the model with bounded retries and exponential backoff, then hands
//! it to the application initializer. Progress goes to a `StatusSink`.

mod collaborators;
mod orchestrator;
mod policy;
mod state;

pub use collaborators::{AppInitializer, ModelLoader, StatusSink};
pub use orchestrator::Bootstrapper;
pub use policy::RetryPolicy;
pub use state::{BootFailure, BootState};
