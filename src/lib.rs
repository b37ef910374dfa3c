//! Warmboot - offline-first resource cache and resilient bootstrap
//!
//! Caches an application's resources in versioned generations, intercepts
//! fetches so the application keeps working without a network, and loads
//! the model with bounded retries and exponential backoff.

pub mod app;
pub mod bootstrap;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod lifecycle;
pub mod model;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{WarmbootError, WarmbootResult};
