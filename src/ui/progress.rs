//! Progress indicators with CI fallback

use super::context::UiContext;
use crate::bootstrap::StatusSink;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if self.interactive {
            println!("{} {}", style("✓").green(), message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else if self.interactive {
            println!("{} {}", style("✗").red(), message);
        } else {
            println!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Bootstrap progress on the terminal
///
/// Shows one indicatif spinner per run in interactive mode; every status
/// message replaces the spinner text. In CI each message is its own line.
pub struct BootStatus {
    fancy: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl BootStatus {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            fancy: ctx.use_fancy_output(),
            bar: Mutex::new(None),
        }
    }

    fn spinner() -> ProgressBar {
        let bar = ProgressBar::new_spinner();
        if let Ok(template) = ProgressStyle::default_spinner()
            .template("  {spinner:.cyan} {msg}  {elapsed:.dim}")
        {
            bar.set_style(template.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    }

    /// Clear the spinner so the next line prints cleanly
    fn finish(&self) {
        if let Ok(mut bar) = self.bar.lock() {
            if let Some(bar) = bar.take() {
                bar.finish_and_clear();
            }
        }
    }
}

impl StatusSink for BootStatus {
    fn report_status(&self, message: &str) {
        if !self.fancy {
            println!("{} {}", style("...").dim(), message);
            return;
        }

        if let Ok(mut bar) = self.bar.lock() {
            bar.get_or_insert_with(Self::spinner)
                .set_message(message.to_string());
        }
    }

    fn show_ready(&self) {
        self.finish();
        if self.fancy {
            println!("{} {}", style("✓").green(), style("Ready").green().bold());
        } else {
            println!("{} Ready", style("[OK]").green());
        }
    }

    fn show_failed(&self, reason: &str) {
        self.finish();
        if self.fancy {
            println!("{} {}", style("✗").red(), reason);
        } else {
            println!("{} {}", style("[FAIL]").red(), reason);
        }
    }
}

impl Drop for BootStatus {
    fn drop(&mut self) {
        self.finish();
    }
}
