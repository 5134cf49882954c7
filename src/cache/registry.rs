//! Last-served fingerprint per source path

use crate::cache::fingerprint::Fingerprint;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Tracks which fingerprint was most recently served for each source path
///
/// The lock is held only for the duration of a single map operation and
/// never across an await point.
#[derive(Debug, Default)]
pub struct FingerprintRegistry {
    served: Mutex<HashMap<PathBuf, Fingerprint>>,
}

impl FingerprintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last-served fingerprint for a path
    pub fn get(&self, path: &Path) -> Option<Fingerprint> {
        self.served
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Record a served fingerprint, returning the one it replaced
    pub fn record(&self, path: &Path, fingerprint: Fingerprint) -> Option<Fingerprint> {
        self.served
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), fingerprint)
    }

    /// Forget a path only while it still maps to `fingerprint`
    ///
    /// A concurrent request may already have recorded a newer fingerprint;
    /// that entry is left alone.
    pub fn remove_if(&self, path: &Path, fingerprint: &Fingerprint) -> bool {
        let mut served = self.served.lock().unwrap_or_else(PoisonError::into_inner);
        if served.get(path) == Some(fingerprint) {
            served.remove(path);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.served
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
