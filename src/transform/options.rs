//! Project-level transform options
//!
//! Read once at startup from an optional JSON file. Two settings are always
//! forced on top of the file: inline source maps and no code highlighting.

use crate::error::{TranscacheError, TranscacheResult};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Options passed to every transform
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TransformOptions(Map<String, Value>);

impl TransformOptions {
    /// Options used when no project file exists
    pub fn project_default() -> Self {
        let mut map = Map::new();
        map.insert("stage".to_string(), json!(0));
        Self(map)
    }

    /// Load options from a project file, falling back to the defaults
    pub async fn load(path: &Path) -> TranscacheResult<Self> {
        let exists = fs::try_exists(path).await.unwrap_or(false);
        if !exists {
            debug!(
                "No transform options at {}, using defaults",
                path.display()
            );
            return Ok(Self::project_default());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            TranscacheError::io(format!("reading transform options {}", path.display()), e)
        })?;

        let options = Self::parse(&content).map_err(|reason| TranscacheError::TransformOptions {
            path: path.to_path_buf(),
            reason,
        })?;

        info!("Loaded transform options from {}", path.display());
        Ok(options)
    }

    /// Parse a project file and apply the forced settings
    pub fn parse(content: &str) -> Result<Self, String> {
        match serde_json::from_str::<Value>(content) {
            Ok(Value::Object(map)) => Ok(Self(map).with_forced()),
            Ok(_) => Err("expected a JSON object".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    fn with_forced(mut self) -> Self {
        self.0.insert("sourceMaps".to_string(), json!("inline"));
        self.0.insert("highlightCode".to_string(), json!(false));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Options serialized for the transformer
    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self::project_default()
    }
}
