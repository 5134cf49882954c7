//! CLI argument definitions using clap derive

use crate::config::schema::CacheBackend;
use crate::config::Config;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// transcache - request-time transformation cache
///
/// Serves source files through an external transform and caches each
/// transformed artifact until the source file changes.
#[derive(Parser, Debug)]
#[command(name = "transcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TRANSCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .transcache.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,

    /// Source root request paths are resolved against
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Cache backend: "memory" or a directory path
    #[arg(long, global = true)]
    pub cache: Option<String>,

    /// Exclusion glob (repeatable); replaces configured patterns
    #[arg(long, global = true)]
    pub exclude: Vec<String>,

    /// Report transform failures as client console scripts
    #[arg(long, global = true)]
    pub console_errors: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

impl Cli {
    /// Apply command-line overrides on top of loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref root) = self.root {
            config.server.source_root = Some(root.clone());
        }
        if let Some(ref cache) = self.cache {
            config.cache.backend = CacheBackend::from(cache.clone());
        }
        if !self.exclude.is_empty() {
            config.server.exclude = self.exclude.clone();
        }
        if self.console_errors {
            config.server.console_errors = true;
        }
        if self.debug {
            config.general.debug = true;
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve request paths through the cache
    Serve(ServeArgs),

    /// Inspect or clear stored artifacts
    Cache(CacheArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Request paths, relative to the source root
    pub paths: Vec<String>,

    /// Also read request paths from stdin, one per line
    #[arg(long)]
    pub stdin: bool,

    /// Dispatch the given paths concurrently
    #[arg(long)]
    pub concurrent: bool,

    /// Output format
    #[arg(short, long, default_value = "full")]
    pub format: ResponseFormat,
}

/// How served responses are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResponseFormat {
    /// Status line, cache headers, then body
    Full,
    /// Body only
    Body,
    /// One JSON object per response
    Json,
}

/// Output format for listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List stored artifacts
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove all stored artifacts
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_serve() {
        let cli = Cli::parse_from(["transcache", "serve", "/foo.js", "/bar.js", "--concurrent"]);
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.paths, vec!["/foo.js", "/bar.js"]);
                assert!(args.concurrent);
                assert!(!args.stdin);
                assert_eq!(args.format, ResponseFormat::Full);
            }
            _ => panic!("expected Serve command"),
        }
    }

    #[test]
    fn cli_parses_serve_json() {
        let cli = Cli::parse_from(["transcache", "serve", "--stdin", "-f", "json"]);
        match cli.command {
            Commands::Serve(args) => {
                assert!(args.stdin);
                assert_eq!(args.format, ResponseFormat::Json);
            }
            _ => panic!("expected Serve command"),
        }
    }

    #[test]
    fn cli_parses_cache_clear() {
        let cli = Cli::parse_from(["transcache", "cache", "clear", "--yes"]);
        match cli.command {
            Commands::Cache(CacheArgs {
                action: CacheAction::Clear { yes },
            }) => assert!(yes),
            _ => panic!("expected Cache clear"),
        }
    }

    #[test]
    fn cli_parses_config_init_force() {
        let cli = Cli::parse_from(["transcache", "config", "init", "--force"]);
        match cli.command {
            Commands::Config(ConfigArgs {
                action: Some(ConfigAction::Init { force }),
            }) => assert!(force),
            _ => panic!("expected Config init"),
        }
    }

    #[test]
    fn overrides_replace_config() {
        let cli = Cli::parse_from([
            "transcache",
            "serve",
            "--root",
            "public",
            "--cache",
            "/tmp/tc",
            "--exclude",
            "vendor/**",
            "--console-errors",
            "--debug",
        ]);
        let mut config = Config::default();
        config.server.exclude = vec!["old/**".to_string()];
        cli.apply_overrides(&mut config);

        assert_eq!(config.server.source_root, Some(PathBuf::from("public")));
        assert_eq!(
            config.cache.backend,
            CacheBackend::Directory(PathBuf::from("/tmp/tc"))
        );
        assert_eq!(config.server.exclude, vec!["vendor/**"]);
        assert!(config.server.console_errors);
        assert!(config.general.debug);
    }

    #[test]
    fn no_overrides_keep_config() {
        let cli = Cli::parse_from(["transcache", "serve"]);
        let mut config = Config::default();
        config.server.exclude = vec!["old/**".to_string()];
        cli.apply_overrides(&mut config);

        assert_eq!(config.server.exclude, vec!["old/**"]);
        assert!(config.cache.backend.is_memory());
    }

    #[test]
    fn cli_verbose_levels() {
        let cli = Cli::parse_from(["transcache", "config"]);
        assert_eq!(cli.verbose, 0);

        let cli = Cli::parse_from(["transcache", "-vv", "config"]);
        assert_eq!(cli.verbose, 2);
    }
}
