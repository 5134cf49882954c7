//! Error types for transcache
//!
//! All modules use `TranscacheResult<T>` as their return type.

use crate::transform::TransformFailure;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for transcache operations
pub type TranscacheResult<T> = Result<T, TranscacheError>;

/// All errors that can occur in transcache
#[derive(Error, Debug)]
pub enum TranscacheError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No source root configured")]
    SourceRootMissing,

    #[error("Invalid exclusion pattern {pattern}: {reason}")]
    ExcludePattern { pattern: String, reason: String },

    #[error("Invalid transform options in {path}: {reason}")]
    TransformOptions { path: PathBuf, reason: String },

    // Request errors
    #[error("Source file unavailable: {path}")]
    SourceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid request path: {path}: {reason}")]
    PathInvalid { path: String, reason: String },

    // Transform errors
    #[error("{0}")]
    TransformRejected(TransformFailure),

    #[error("Transform command failed to start: {command}")]
    TransformSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No transform command configured")]
    TransformNotConfigured,

    // Artifact store errors
    #[error("Failed to write artifact {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove artifact {path}: {source}")]
    StoreDelete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache directory unavailable {path}: {source}")]
    StoreInit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("{0}")]
    User(String),
}

impl TranscacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a source file error for the given path
    pub fn source_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SourceIo {
            path: path.into(),
            source,
        }
    }

    /// Create an artifact write error
    pub fn store_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StoreWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a transform spawn error
    pub fn transform_spawn(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::TransformSpawn {
            command: command.into(),
            source,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::SourceRootMissing => {
                Some("Pass --root or set server.source_root in the config file")
            }
            Self::TransformNotConfigured => {
                Some("Set transform.command in the config file, e.g. command = \"babel\"")
            }
            Self::TransformSpawn { .. } => Some("Check that transform.command is on PATH"),
            Self::StoreInit { .. } => Some("Check permissions on the cache directory"),
            _ => None,
        }
    }
}
