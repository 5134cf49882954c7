//! Artifact store abstraction
//!
//! Provides a trait for artifact storage that is implemented by two
//! backends selected at construction time:
//! - `MemoryStore`: process-lifetime map, lost on exit
//! - `DirectoryStore`: one file per fingerprint in a flat directory

use crate::cache::fingerprint::Fingerprint;
use crate::config::schema::CacheBackend;
use crate::error::{TranscacheError, TranscacheResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::fs;
use tracing::debug;

/// File extension of durable artifacts
pub const ARTIFACT_EXT: &str = "js";

/// File extension of in-progress writes
const TEMP_EXT: &str = "tmp";

/// Summary of one stored artifact
#[derive(Debug, Clone)]
pub struct ArtifactInfo {
    pub fingerprint: Fingerprint,
    pub size: u64,
    pub stored_at: Option<DateTime<Utc>>,
}

/// Storage for transformed artifacts, keyed by fingerprint
///
/// At most one artifact exists per fingerprint; `put` replaces.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Make the backing location usable (create the directory, etc.)
    async fn ensure_ready(&self) -> TranscacheResult<()>;

    /// Fetch an artifact, `None` if absent
    async fn get(&self, fingerprint: &Fingerprint) -> TranscacheResult<Option<String>>;

    /// Check whether an artifact exists without reading it
    async fn contains(&self, fingerprint: &Fingerprint) -> bool;

    /// Store an artifact under a fingerprint
    async fn put(&self, fingerprint: &Fingerprint, artifact: &str) -> TranscacheResult<()>;

    /// Remove an artifact; absent fingerprints are not an error
    async fn delete(&self, fingerprint: &Fingerprint) -> TranscacheResult<()>;

    /// List stored artifacts
    async fn list(&self) -> TranscacheResult<Vec<ArtifactInfo>>;

    /// Remove every artifact, returning how many were removed
    async fn clear(&self) -> TranscacheResult<usize>;

    /// Human-readable location of the store
    fn describe(&self) -> String;
}

/// Create the store for a configured backend
pub fn create_store(backend: &CacheBackend) -> Arc<dyn ArtifactStore> {
    match backend {
        CacheBackend::Memory => Arc::new(MemoryStore::new()),
        CacheBackend::Directory(dir) => Arc::new(DirectoryStore::new(dir.clone())),
    }
}

struct MemoryEntry {
    code: String,
    stored_at: DateTime<Utc>,
}

/// Volatile in-process artifact store
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<Fingerprint, MemoryEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of artifacts currently held
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn ensure_ready(&self) -> TranscacheResult<()> {
        Ok(())
    }

    async fn get(&self, fingerprint: &Fingerprint) -> TranscacheResult<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(fingerprint).map(|e| e.code.clone()))
    }

    async fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(fingerprint)
    }

    async fn put(&self, fingerprint: &Fingerprint, artifact: &str) -> TranscacheResult<()> {
        let entry = MemoryEntry {
            code: artifact.to_string(),
            stored_at: Utc::now(),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(fingerprint.clone(), entry);
        Ok(())
    }

    async fn delete(&self, fingerprint: &Fingerprint) -> TranscacheResult<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(fingerprint);
        Ok(())
    }

    async fn list(&self) -> TranscacheResult<Vec<ArtifactInfo>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut infos: Vec<ArtifactInfo> = entries
            .iter()
            .map(|(fingerprint, entry)| ArtifactInfo {
                fingerprint: fingerprint.clone(),
                size: entry.code.len() as u64,
                stored_at: Some(entry.stored_at),
            })
            .collect();
        infos.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));
        Ok(infos)
    }

    async fn clear(&self) -> TranscacheResult<usize> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let count = entries.len();
        entries.clear();
        Ok(count)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Durable artifact store backed by a flat directory
///
/// Artifacts live at `<dir>/<fingerprint>.js` and survive restarts.
pub struct DirectoryStore {
    dir: PathBuf,
    writes: AtomicU64,
}

impl DirectoryStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            writes: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact file for a fingerprint
    pub fn path_for(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{}.{}", fingerprint, ARTIFACT_EXT))
    }

    /// Unique temp path per write, so concurrent puts never share a file
    fn temp_path_for(&self, fingerprint: &Fingerprint) -> PathBuf {
        let n = self.writes.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(
            ".{}.{}.{}-{}.{}",
            fingerprint,
            ARTIFACT_EXT,
            std::process::id(),
            n,
            TEMP_EXT
        ))
    }

    /// Leftover from an interrupted write
    fn is_temp_file(path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| {
                name.starts_with('.') && name.ends_with(&format!(".{}", TEMP_EXT))
            })
    }
}

#[async_trait]
impl ArtifactStore for DirectoryStore {
    async fn ensure_ready(&self) -> TranscacheResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| TranscacheError::StoreInit {
                path: self.dir.clone(),
                source: e,
            })
    }

    async fn get(&self, fingerprint: &Fingerprint) -> TranscacheResult<Option<String>> {
        let path = self.path_for(fingerprint);
        match fs::read_to_string(&path).await {
            Ok(code) => Ok(Some(code)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TranscacheError::io(
                format!("reading artifact {}", path.display()),
                e,
            )),
        }
    }

    async fn contains(&self, fingerprint: &Fingerprint) -> bool {
        fs::try_exists(self.path_for(fingerprint))
            .await
            .unwrap_or(false)
    }

    async fn put(&self, fingerprint: &Fingerprint, artifact: &str) -> TranscacheResult<()> {
        let path = self.path_for(fingerprint);
        let temp = self.temp_path_for(fingerprint);

        // Write then rename so readers never see a partial artifact
        fs::write(&temp, artifact)
            .await
            .map_err(|e| TranscacheError::store_write(&path, e))?;

        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(TranscacheError::store_write(&path, e));
        }

        debug!("Stored artifact {}", path.display());
        Ok(())
    }

    async fn delete(&self, fingerprint: &Fingerprint) -> TranscacheResult<()> {
        let path = self.path_for(fingerprint);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed artifact {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TranscacheError::StoreDelete { path, source: e }),
        }
    }

    async fn list(&self) -> TranscacheResult<Vec<ArtifactInfo>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(TranscacheError::io("reading cache directory", e)),
        };

        let mut infos = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| TranscacheError::io("reading cache entry", e))?
        {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != ARTIFACT_EXT) {
                continue;
            }
            let Some(fingerprint) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(Fingerprint::parse)
            else {
                continue;
            };

            let metadata = entry
                .metadata()
                .await
                .map_err(|e| TranscacheError::io("reading cache entry metadata", e))?;

            infos.push(ArtifactInfo {
                fingerprint,
                size: metadata.len(),
                stored_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        infos.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));
        Ok(infos)
    }

    async fn clear(&self) -> TranscacheResult<usize> {
        let infos = self.list().await?;
        for info in &infos {
            self.delete(&info.fingerprint).await?;
        }

        // Temp files are not artifacts and are not counted
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(infos.len()),
            Err(e) => return Err(TranscacheError::io("reading cache directory", e)),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| TranscacheError::io("reading cache entry", e))?
        {
            let path = entry.path();
            if !Self::is_temp_file(&path) {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => debug!("Removed stale temp file {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(TranscacheError::StoreDelete { path, source: e }),
            }
        }

        Ok(infos.len())
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}
