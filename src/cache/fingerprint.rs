//! Source file fingerprinting
//!
//! A fingerprint identifies a file's observed state by path and
//! modification time. File contents are never read, so two writes within
//! one tick of the filesystem clock produce the same fingerprint.

use crate::error::{TranscacheError, TranscacheResult};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;

/// Number of digest bytes kept in a fingerprint (32 hex chars)
const FINGERPRINT_BYTES: usize = 16;

/// Opaque identifier of a source file's (path, mtime) state
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute a fingerprint from a path and modification time
    pub fn from_parts(path: &Path, modified: SystemTime) -> Self {
        let nanos = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        let mut hasher = Sha256::new();
        hasher.update(format!("{}-{}", nanos, path.display()).as_bytes());
        let digest = hasher.finalize();

        Self(hex::encode(&digest[..FINGERPRINT_BYTES]))
    }

    /// Wrap an existing fingerprint value, e.g. a durable artifact file stem
    ///
    /// Returns `None` unless the value looks like a fingerprint.
    pub fn parse(value: &str) -> Option<Self> {
        let valid = value.len() == FINGERPRINT_BYTES * 2
            && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        valid.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint the current state of a source file
///
/// Reads link metadata only; a symlink is fingerprinted by its own mtime.
pub async fn fingerprint(path: &Path) -> TranscacheResult<Fingerprint> {
    let metadata = fs::symlink_metadata(path)
        .await
        .map_err(|e| TranscacheError::source_io(path, e))?;

    let modified = metadata
        .modified()
        .map_err(|e| TranscacheError::source_io(path, e))?;

    Ok(Fingerprint::from_parts(path, modified))
}
