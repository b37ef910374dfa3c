//! Install command - populate and activate the configured generation

use crate::app::AppContext;
use crate::config::Config;
use crate::error::WarmbootResult;
use crate::lifecycle::Registration;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the install command
pub async fn execute(config: &Config) -> WarmbootResult<()> {
    let ctx = UiContext::detect();
    let app = AppContext::from_config(config)?;
    let mut controller = app.controller();

    ui::intro(&ctx, "warmboot install");
    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Installing {}", app.generation()));

    let registration = match controller.register().await {
        Ok(registration) => registration,
        Err(e) => {
            spinner.stop_error(&format!("Install of {} failed", app.generation()));
            return Err(e);
        }
    };

    if registration.install.skipped {
        spinner.stop(&format!("{} already installed", app.generation()));
    } else {
        spinner.stop(&format!("Installed {}", app.generation()));
    }
    report(&ctx, &registration);

    ui::outro_success(&ctx, "Offline cache ready");
    Ok(())
}

fn report(ctx: &UiContext, registration: &Registration) {
    let install = &registration.install;
    if !install.skipped {
        ui::step_ok_detail(ctx, "Shell cached", &format!("{} resource(s)", install.stored));
        if install.external_stored > 0 {
            ui::step_ok_detail(
                ctx,
                "Dependencies cached",
                &format!("{} resource(s)", install.external_stored),
            );
        }
        for url in &install.external_failed {
            ui::step_warn_hint(ctx, url, "not cached, fetched live when needed");
        }
    }

    let removed = &registration.activation.removed;
    if removed.is_empty() {
        ui::step_ok(ctx, "Activated");
    } else {
        ui::step_ok_detail(
            ctx,
            "Activated",
            &format!("removed {} stale generation(s)", removed.len()),
        );
    }
}
