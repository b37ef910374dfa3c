//! Cache lifecycle: install, activate, steady state
//!
//! A `LifecycleController` owns one generation. Install fills it from the
//! manifest, activation deletes every other generation and claims the
//! `Scope`, after which all `ResourceClient`s are served by its interceptor
//! until a newer controller activates.

mod controller;
mod manifest;
mod scope;

pub use controller::{ActivationReport, InstallReport, LifecycleController, Phase, Registration};
pub use manifest::ResourceManifest;
pub use scope::{ResourceClient, Scope};
