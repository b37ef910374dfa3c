//! Config command - show, create or validate configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{WarmbootError, WarmbootResult};
use crate::ui::{self, UiContext};

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> WarmbootResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => show_path(manager),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Validate) => validate_config(config, manager)?,
    }

    Ok(())
}

fn show_config(config: &Config) -> WarmbootResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn show_path(manager: &ConfigManager) {
    println!("{}", manager.path().display());
}

async fn init_config(manager: &ConfigManager, force: bool) -> WarmbootResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if manager.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;

    ui::step_ok_detail(
        &ctx,
        "Configuration initialized",
        &path.display().to_string(),
    );

    Ok(())
}

fn validate_config(config: &Config, manager: &ConfigManager) -> WarmbootResult<()> {
    let ctx = UiContext::detect();
    let problems = config.problems();

    if problems.is_empty() {
        let generation = config.generation_id()?;
        ui::step_ok_detail(&ctx, "Configuration valid", &format!("generation {}", generation));
        return Ok(());
    }

    for problem in &problems {
        ui::step_error(&ctx, problem);
    }
    Err(WarmbootError::ConfigInvalid {
        path: manager.path().to_path_buf(),
        reason: format!("{} problem(s) found", problems.len()),
    })
}
