//! CLI command implementations

pub mod boot;
pub mod cache;
pub mod config;
pub mod fetch;
pub mod install;

pub use boot::execute as boot;
pub use cache::execute as cache;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use install::execute as install;
