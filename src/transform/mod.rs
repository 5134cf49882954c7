//! Transform adapter
//!
//! The transform itself is an external collaborator. This module defines
//! the contract the cache drives (`Transformer`), the failure it reports,
//! and the project-level options handed to every transform.

mod command;
mod options;

pub use command::{CommandTransformer, OPTIONS_ENV};
pub use options::TransformOptions;

use crate::config::schema::TransformConfig;
use crate::error::{TranscacheError, TranscacheResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Source-to-source transform
///
/// Implementations return `TranscacheError::TransformRejected` when the
/// input itself is at fault. Any other error means the transform could not
/// run at all (missing file, unreadable file, missing executable).
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Transform the file at `source`
    async fn transform(&self, source: &Path, options: &TransformOptions)
        -> TranscacheResult<String>;

    /// Human-readable transformer name for logs
    fn name(&self) -> &str;
}

/// Create the transformer described by configuration
pub fn create_transformer(config: &TransformConfig) -> TranscacheResult<Arc<dyn Transformer>> {
    if config.command.trim().is_empty() {
        return Err(TranscacheError::TransformNotConfigured);
    }
    Ok(Arc::new(CommandTransformer::new(
        config.command.clone(),
        config.args.clone(),
    )))
}

/// Position of a transform failure in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

/// Structured failure reported by a transform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformFailure {
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_frame: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<SourceLocation>,
}

impl TransformFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code_frame: None,
            loc: None,
        }
    }

    pub fn with_code_frame(mut self, code_frame: impl Into<String>) -> Self {
        self.code_frame = Some(code_frame.into());
        self
    }

    pub fn with_location(mut self, line: u32, column: u32) -> Self {
        self.loc = Some(SourceLocation { line, column });
        self
    }

    /// Build a failure from transformer diagnostics
    ///
    /// Accepts a JSON failure object; anything else becomes the message.
    pub fn from_diagnostics(diagnostics: &str) -> Self {
        let trimmed = diagnostics.trim();
        match serde_json::from_str::<TransformFailure>(trimmed) {
            Ok(failure) => failure,
            Err(_) if trimmed.is_empty() => Self::new("transform failed without diagnostics"),
            Err(_) => Self::new(trimmed),
        }
    }
}

impl fmt::Display for TransformFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.loc {
            Some(ref loc) => write!(f, "{} ({}:{})", self.message, loc.line, loc.column),
            None => f.write_str(&self.message),
        }
    }
}
