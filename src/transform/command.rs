//! Transformer that runs an external command
//!
//! Invokes `<command> <args...> <source>` with the transform options as
//! JSON in `TRANSCACHE_OPTIONS`. Stdout is the transformed code; a
//! non-zero exit is a rejection described by stderr.

use crate::error::{TranscacheError, TranscacheResult};
use crate::transform::{TransformFailure, TransformOptions, Transformer};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;
use tracing::debug;

/// Environment variable carrying the serialized transform options
pub const OPTIONS_ENV: &str = "TRANSCACHE_OPTIONS";

/// Transformer backed by an external process
pub struct CommandTransformer {
    command: String,
    args: Vec<String>,
}

impl CommandTransformer {
    pub fn new(command: String, args: Vec<String>) -> Self {
        Self { command, args }
    }
}

#[async_trait]
impl Transformer for CommandTransformer {
    async fn transform(
        &self,
        source: &Path,
        options: &TransformOptions,
    ) -> TranscacheResult<String> {
        // Surface unreadable sources as IO faults, not transform rejections
        fs::File::open(source)
            .await
            .map_err(|e| TranscacheError::source_io(source, e))?;

        debug!("Executing: {} {:?} {}", self.command, self.args, source.display());

        let output = Command::new(&self.command)
            .args(&self.args)
            .arg(source)
            .env(OPTIONS_ENV, options.to_json())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TranscacheError::transform_spawn(&self.command, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscacheError::TransformRejected(
                TransformFailure::from_diagnostics(&stderr),
            ));
        }

        String::from_utf8(output.stdout).map_err(|_| {
            TranscacheError::TransformRejected(TransformFailure::new(format!(
                "{} produced output that is not valid UTF-8",
                self.command
            )))
        })
    }

    fn name(&self) -> &str {
        &self.command
    }
}
