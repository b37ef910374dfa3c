//! Cache command - inspect and clear cache generations

use crate::cache::{format_bytes, CacheStore, GenerationId, GenerationInfo, GenerationState, GenerationStats};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::{WarmbootError, WarmbootResult};
use crate::ui::{self, UiContext};
use console::style;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> WarmbootResult<()> {
    let store = CacheStore::new(config.cache.root());

    match args.action {
        CacheAction::List { format } => list_generations(&store, format).await,
        CacheAction::Info { generation } => show_generation(&store, config, generation).await,
        CacheAction::Clear { yes } => clear_generations(&store, yes).await,
    }
}

struct GenerationRow {
    info: GenerationInfo,
    stats: GenerationStats,
}

async fn collect(store: &CacheStore) -> WarmbootResult<Vec<GenerationRow>> {
    let mut rows = Vec::new();
    for id in store.list_generations().await? {
        let Some(info) = store.generation_info(&id).await? else {
            continue;
        };
        let stats = match store.existing(&id).await? {
            Some(handle) => handle.stats().await?,
            None => continue,
        };
        rows.push(GenerationRow { info, stats });
    }
    Ok(rows)
}

/// List all cache generations
async fn list_generations(store: &CacheStore, format: OutputFormat) -> WarmbootResult<()> {
    let rows = collect(store).await?;

    match format {
        OutputFormat::Table => print_table(store, &rows),
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Plain => print_plain(&rows),
    }

    Ok(())
}

fn print_table(store: &CacheStore, rows: &[GenerationRow]) {
    if rows.is_empty() {
        println!("No cache generations in {}", store.root().display());
        return;
    }

    println!(
        "{:<40} {:<10} {:>8} {:>10} {:<20}",
        "GENERATION", "STATE", "ENTRIES", "SIZE", "CREATED"
    );
    println!("{}", "-".repeat(92));

    for row in rows {
        let state = match row.info.state {
            GenerationState::Complete => style("complete").green().to_string(),
            GenerationState::Building => style("building").yellow().to_string(),
        };
        println!(
            "{:<40} {:<10} {:>8} {:>10} {:<20}",
            row.info.id.as_str(),
            state,
            row.stats.entries,
            format_bytes(row.stats.bytes),
            row.info.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!();
    println!("Total: {} generation(s)", rows.len());
}

fn print_json(rows: &[GenerationRow]) -> WarmbootResult<()> {
    #[derive(serde::Serialize)]
    struct GenerationJson<'a> {
        id: &'a str,
        state: GenerationState,
        entries: usize,
        bytes: u64,
        created_at: String,
        completed_at: Option<String>,
    }

    let json: Vec<GenerationJson<'_>> = rows
        .iter()
        .map(|row| GenerationJson {
            id: row.info.id.as_str(),
            state: row.info.state,
            entries: row.stats.entries,
            bytes: row.stats.bytes,
            created_at: row.info.created_at.to_rfc3339(),
            completed_at: row.info.completed_at.map(|t| t.to_rfc3339()),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn print_plain(rows: &[GenerationRow]) {
    for row in rows {
        println!("{}", row.info.id);
    }
}

/// Show the entries of one generation
async fn show_generation(
    store: &CacheStore,
    config: &Config,
    generation: Option<String>,
) -> WarmbootResult<()> {
    let id = match generation {
        Some(id) => GenerationId::new(id)?,
        None => config.generation_id()?,
    };
    let handle = store
        .existing(&id)
        .await?
        .ok_or_else(|| WarmbootError::GenerationNotFound(id.to_string()))?;

    println!("Generation: {}", style(&id).cyan());
    if let Some(info) = store.generation_info(&id).await? {
        println!("State: {}", info.state);
    }
    println!();

    let entries = handle.entries().await?;
    for entry in &entries {
        println!(
            "  {} {} {}",
            style(entry.status).dim(),
            entry.url,
            style(entry.content_type.as_deref().unwrap_or("-")).dim()
        );
    }
    println!();
    println!("Total: {} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
    Ok(())
}

/// Delete every generation
async fn clear_generations(store: &CacheStore, yes: bool) -> WarmbootResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);
    let generations = store.list_generations().await?;

    if generations.is_empty() {
        println!("No cache generations to clear.");
        return Ok(());
    }

    let prompt = format!("Delete {} cache generation(s)?", generations.len());
    if !ui::confirm(&ctx, &prompt, false).await? {
        if !ctx.is_interactive() {
            ui::step_warn_hint(&ctx, "Nothing deleted", "Use --yes to clear without a prompt");
        }
        return Ok(());
    }

    let removed = store.clear().await?;
    ui::step_ok(&ctx, &format!("Removed {} generation(s)", removed.len()));
    Ok(())
}
