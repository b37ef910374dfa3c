//! Boot command - prepare the cache and load the model

use crate::app::{AppContext, Attachment};
use crate::cache::format_bytes;
use crate::cli::args::BootArgs;
use crate::config::Config;
use crate::error::WarmbootResult;
use crate::ui::{self, BootStatus, UiContext};
use std::sync::Arc;

/// Execute the boot command
pub async fn execute(args: BootArgs, config: &Config) -> WarmbootResult<()> {
    let ctx = UiContext::detect();
    let app = AppContext::from_config(config)?;

    ui::intro(&ctx, "warmboot boot");
    match app.attach().await? {
        Attachment::Registered(registration) => ui::step_ok_detail(
            &ctx,
            "Cache ready",
            registration.activation.generation.as_str(),
        ),
        Attachment::Previous { generation, reason } => ui::step_warn_hint(
            &ctx,
            &format!("Serving {} from cache", generation),
            &reason,
        ),
    }

    let mut boot = app.bootstrapper(Arc::new(BootStatus::new(&ctx)));
    let mut restarts_left = args.retries;

    loop {
        let err = match boot.start().await {
            Ok(model) => {
                app.scope().settle().await;
                ui::key_value(&ctx, "Model", &model.url);
                ui::key_value(&ctx, "Weights", &format_bytes(model.weights.len() as u64));
                ui::outro_success(&ctx, "Application ready");
                return Ok(());
            }
            Err(e) => e,
        };

        let restart = if restarts_left > 0 {
            restarts_left -= 1;
            true
        } else if args.no_prompt {
            false
        } else {
            ui::confirm(&ctx, "Bootstrap failed. Try again?", false).await?
        };

        if !restart {
            app.scope().settle().await;
            return Err(err);
        }
        boot.retry()?;
    }
}
