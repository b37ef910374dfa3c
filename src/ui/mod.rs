//! Terminal UI
//!
//! Uses `cliclack` for prompts and step output and `indicatif` for the
//! bootstrap spinner, with plain-text fallback in CI/non-interactive
//! environments.

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{intro, key_value, outro_success, step_error, step_ok, step_ok_detail, step_warn_hint};
pub use progress::{BootStatus, TaskSpinner};
pub use prompts::confirm;
