//! transcache - request-time transformation cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use transcache::cli::{Cli, Commands};
use transcache::config::{Config, ConfigManager};
use transcache::error::{TranscacheError, TranscacheResult};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> TranscacheResult<()> {
    let cli = Cli::parse();

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    // Find local config unless --no-local is set
    let local_config_path = if cli.no_local || cli.config.is_some() {
        None
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| TranscacheError::io("getting current directory", e))?;
        ConfigManager::find_local_config(&cwd)
    };

    let mut config = config_manager
        .load_preferring(local_config_path.as_deref())
        .await?;
    cli.apply_overrides(&mut config);

    init_logging(cli.verbose, &config);
    if let Some(ref path) = local_config_path {
        debug!("Loaded local config: {}", path.display());
    }

    match cli.command {
        Commands::Serve(args) => transcache::cli::commands::serve(args, &config).await,
        Commands::Cache(args) => transcache::cli::commands::cache(args, &config).await,
        Commands::Config(args) => {
            transcache::cli::commands::config(args, &config, &config_manager).await
        }
    }
}

/// Initialize logging on stderr: 0 = warn, 1 = info, 2+ or debug = debug
///
/// `RUST_LOG` takes precedence when set.
fn init_logging(verbose: u8, config: &Config) {
    let level = match (verbose, config.general.debug) {
        (_, true) | (2.., _) => "transcache=debug",
        (1, _) => "transcache=info",
        _ => "transcache=warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .init();
    }
}
