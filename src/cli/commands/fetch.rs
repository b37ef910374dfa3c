//! Fetch command - resolve one resource through the cache

use crate::app::AppContext;
use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::{WarmbootError, WarmbootResult};
use std::io::Write;
use tokio::fs;
use tracing::info;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> WarmbootResult<()> {
    let app = AppContext::from_config(config)?;
    if app.attach_installed().await?.is_none() {
        info!("No installed generation, fetching from network");
    }

    let response = app.scope().client().fetch(&args.resource).await?;
    info!(
        "{} {} from {}",
        response.status,
        response.url,
        response.source
    );
    let response = response.error_for_status()?;
    app.scope().settle().await;

    match args.output {
        Some(path) => fs::write(&path, &response.body)
            .await
            .map_err(|e| WarmbootError::io(format!("writing {}", path.display()), e))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&response.body)
                .and_then(|()| stdout.flush())
                .map_err(|e| WarmbootError::io("writing to stdout", e))?;
        }
    }

    Ok(())
}
