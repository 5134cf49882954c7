//! Configuration schema for transcache
//!
//! Configuration is stored at `~/.config/transcache/config.toml`, or in a
//! project-local `.transcache.toml`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Request handling settings
    pub server: ServerConfig,

    /// Artifact cache settings
    pub cache: CacheConfig,

    /// External transform settings
    pub transform: TransformConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable debug logging
    pub debug: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_format: "text".to_string(),
        }
    }
}

/// Request handling settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory request paths are resolved against (required)
    pub source_root: Option<PathBuf>,

    /// Globs of request paths served raw, bypassing the cache
    pub exclude: Vec<String>,

    /// Report transform failures as a script logging to the client console
    pub console_errors: bool,
}

/// Where artifacts are stored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CacheBackend {
    /// In-process map, lost on exit
    #[default]
    Memory,
    /// Flat directory of artifact files
    Directory(PathBuf),
}

impl CacheBackend {
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl From<String> for CacheBackend {
    fn from(value: String) -> Self {
        if value.is_empty() || value == "memory" {
            Self::Memory
        } else {
            Self::Directory(PathBuf::from(value))
        }
    }
}

impl From<CacheBackend> for String {
    fn from(backend: CacheBackend) -> Self {
        backend.to_string()
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

/// Artifact cache settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// "memory" or a directory path
    pub backend: CacheBackend,
}

/// External transform settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Executable invoked as `<command> <args...> <source>`
    pub command: String,

    /// Arguments placed before the source path
    pub args: Vec<String>,

    /// Project transform options file, read once at startup
    pub options_file: PathBuf,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: vec![],
            options_file: PathBuf::from(".babelrc"),
        }
    }
}
