//! Cache command - inspect or clear stored artifacts

use crate::cache::{create_store, ArtifactInfo, ArtifactStore};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::TranscacheResult;
use console::style;
use std::io::{self, Write};
use tracing::debug;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> TranscacheResult<()> {
    let backend = &config.cache.backend;

    if backend.is_memory() {
        println!("The memory backend only holds artifacts inside a running serve process.");
        return Ok(());
    }

    let store = create_store(backend);
    debug!("Using cache store {}", store.describe());

    match args.action {
        CacheAction::List { format } => list_artifacts(store.as_ref(), format).await,
        CacheAction::Clear { yes } => clear_artifacts(store.as_ref(), yes).await,
    }
}

/// List stored artifacts
async fn list_artifacts(store: &dyn ArtifactStore, format: OutputFormat) -> TranscacheResult<()> {
    let artifacts = store.list().await?;

    match format {
        OutputFormat::Table => print_table(store, &artifacts),
        OutputFormat::Json => print_json(&artifacts)?,
        OutputFormat::Plain => {
            for artifact in &artifacts {
                println!("{}", artifact.fingerprint);
            }
        }
    }

    Ok(())
}

fn print_table(store: &dyn ArtifactStore, artifacts: &[ArtifactInfo]) {
    if artifacts.is_empty() {
        println!("No artifacts in {}", store.describe());
        return;
    }

    println!(
        "{:<34} {:>10} {:<20}",
        style("FINGERPRINT").bold(),
        style("SIZE").bold(),
        style("STORED").bold()
    );
    println!("{}", "-".repeat(66));

    for artifact in artifacts {
        let stored = artifact
            .stored_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<34} {:>10} {:<20}",
            artifact.fingerprint,
            format_size(artifact.size),
            stored
        );
    }

    println!();
    println!(
        "{} artifact(s) in {}",
        artifacts.len(),
        style(store.describe()).cyan()
    );
}

fn print_json(artifacts: &[ArtifactInfo]) -> TranscacheResult<()> {
    let entries: Vec<serde_json::Value> = artifacts
        .iter()
        .map(|a| {
            serde_json::json!({
                "fingerprint": a.fingerprint,
                "size": a.size,
                "stored_at": a.stored_at.map(|t| t.to_rfc3339()),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

/// Remove every stored artifact
async fn clear_artifacts(store: &dyn ArtifactStore, skip_confirm: bool) -> TranscacheResult<()> {
    let artifacts = store.list().await?;

    if artifacts.is_empty() {
        println!("No artifacts to clear.");
        return Ok(());
    }

    if !skip_confirm {
        print!(
            "Remove {} artifact(s) from {}? [y/N] ",
            artifacts.len(),
            store.describe()
        );
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            println!("Failed to read input, aborting.");
            return Ok(());
        }

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let removed = store.clear().await?;
    println!("{} cleared {} artifact(s)", style("✓").green(), removed);

    Ok(())
}

/// Human-readable byte size
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
