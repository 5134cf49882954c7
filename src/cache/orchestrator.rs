//! Cache orchestrator
//!
//! Decides, per request, whether the transformed artifact for a source file
//! can be served from the store or has to be rebuilt.
//!
//! # Request states
//!
//! | State | Condition | Effect |
//! |-------|-----------|--------|
//! | Bypass | path matches an exclusion glob | raw file served, cache untouched |
//! | Hit | registry fingerprint == current and artifact stored | stored bytes served |
//! | Miss | no registry entry, or artifact missing | transform, store, record |
//! | Stale | registry fingerprint != current | evict prior artifact, then Miss |
//!
//! Concurrent first requests for the same file may both transform and both
//! write the same fingerprint; the last write wins. There is no
//! per-fingerprint lock.

use crate::cache::fingerprint::{fingerprint, Fingerprint};
use crate::cache::registry::FingerprintRegistry;
use crate::cache::response::{CacheMarkers, Response};
use crate::cache::store::{create_store, ArtifactStore};
use crate::config::Config;
use crate::error::{TranscacheError, TranscacheResult};
use crate::exclude::ExclusionSet;
use crate::transform::{create_transformer, TransformOptions, Transformer};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

/// Request handling settings for an orchestrator
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Directory request paths are resolved against
    pub source_root: PathBuf,
    /// Request paths served raw
    pub exclude: ExclusionSet,
    /// Render transform failures as console scripts
    pub console_errors: bool,
    /// Project transform options file
    pub options_file: PathBuf,
}

impl CacheSettings {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            exclude: ExclusionSet::default(),
            console_errors: false,
            options_file: PathBuf::from(".babelrc"),
        }
    }

    /// Build settings from configuration
    pub fn from_config(config: &Config) -> TranscacheResult<Self> {
        let source_root = config
            .server
            .source_root
            .clone()
            .ok_or(TranscacheError::SourceRootMissing)?;

        Ok(Self {
            source_root,
            exclude: ExclusionSet::new(&config.server.exclude)?,
            console_errors: config.server.console_errors,
            options_file: config.transform.options_file.clone(),
        })
    }
}

/// Outcome of consulting the registry and store
enum Lookup {
    Hit(String),
    Miss,
}

/// Owns the registry and drives the artifact store for every request
pub struct CacheOrchestrator {
    settings: CacheSettings,
    store: Arc<dyn ArtifactStore>,
    transformer: Arc<dyn Transformer>,
    registry: FingerprintRegistry,
    startup: OnceCell<TransformOptions>,
}

impl CacheOrchestrator {
    pub fn new(
        settings: CacheSettings,
        store: Arc<dyn ArtifactStore>,
        transformer: Arc<dyn Transformer>,
    ) -> Self {
        Self {
            settings,
            store,
            transformer,
            registry: FingerprintRegistry::new(),
            startup: OnceCell::new(),
        }
    }

    /// Build an orchestrator with the store and transformer from configuration
    pub fn from_config(config: &Config) -> TranscacheResult<Self> {
        let settings = CacheSettings::from_config(config)?;
        let store = create_store(&config.cache.backend);
        let transformer = create_transformer(&config.transform)?;
        Ok(Self::new(settings, store, transformer))
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn registry(&self) -> &FingerprintRegistry {
        &self.registry
    }

    pub fn store(&self) -> &dyn ArtifactStore {
        self.store.as_ref()
    }

    /// Run startup once: load transform options and ready the store
    ///
    /// Every request awaits this before any cache decision. A failure is
    /// not memoized, so the next request tries again.
    pub async fn ready(&self) -> TranscacheResult<&TransformOptions> {
        self.startup
            .get_or_try_init(|| async move {
                let (options, ready) = tokio::join!(
                    TransformOptions::load(&self.settings.options_file),
                    self.store.ensure_ready()
                );
                ready?;
                let options = options?;
                info!(
                    "Cache ready: store {}, transformer {}",
                    self.store.describe(),
                    self.transformer.name()
                );
                Ok::<_, TranscacheError>(options)
            })
            .await
    }

    /// Serve one request path
    pub async fn handle(&self, request_path: &str) -> Response {
        let console_errors = self.settings.console_errors;

        let relative = match normalize(request_path) {
            Ok(relative) => relative,
            Err(e) => return Response::error(CacheMarkers::default(), &e, console_errors),
        };
        let source = self.settings.source_root.join(&relative);

        if self.settings.exclude.matches(&relative.to_string_lossy()) {
            debug!(
                "Excluded: {} ({})",
                request_path,
                self.settings.exclude.describe()
            );
            return self.serve_raw(&source).await;
        }

        let options = match self.ready().await {
            Ok(options) => options,
            Err(e) => {
                error!("Cache startup failed: {}", e);
                return Response::error(CacheMarkers::default(), &e, console_errors);
            }
        };

        let current = match fingerprint(&source).await {
            Ok(fp) => fp,
            Err(e) => {
                debug!("Cannot fingerprint {}: {}", source.display(), e);
                return Response::error(CacheMarkers::default(), &e, console_errors);
            }
        };

        debug!("Preparing: {} ({})", source.display(), current);
        let markers = CacheMarkers::cached(&current);

        match self.lookup(&source, &current).await {
            Lookup::Hit(code) => {
                debug!("Serving (cached): {}", source.display());
                Response::ok(markers.with_hit(true), code)
            }
            Lookup::Miss => {
                let markers = markers.with_hit(false);
                match self.rebuild(&source, &current, options).await {
                    Ok(code) => {
                        debug!("Serving (uncached): {}", source.display());
                        Response::ok(markers, code)
                    }
                    Err(e) => Response::error(markers, &e, console_errors),
                }
            }
        }
    }

    async fn serve_raw(&self, source: &Path) -> Response {
        match fs::read(source).await {
            Ok(bytes) => Response::ok(CacheMarkers::bypassed(), bytes),
            Err(e) => Response::error(
                CacheMarkers::bypassed(),
                &TranscacheError::source_io(source, e),
                self.settings.console_errors,
            ),
        }
    }

    async fn lookup(&self, source: &Path, current: &Fingerprint) -> Lookup {
        let mut prior = self.registry.get(source);

        // An artifact stored under the current fingerprint by an earlier
        // process (durable store) is adopted instead of rebuilt.
        if prior.as_ref() != Some(current) && self.store.contains(current).await {
            debug!("Adopting stored artifact {} for {}", current, source.display());
            if let Some(old) = prior.take() {
                self.evict(source, &old).await;
            }
            self.registry.record(source, current.clone());
            prior = Some(current.clone());
        }

        match prior {
            Some(ref known) if known == current => match self.store.get(current).await {
                Ok(Some(code)) => Lookup::Hit(code),
                Ok(None) => {
                    debug!("Artifact {} missing from store, rebuilding", current);
                    self.reready_store().await;
                    Lookup::Miss
                }
                Err(e) => {
                    warn!("Failed to read artifact {}: {}", current, e);
                    self.reready_store().await;
                    Lookup::Miss
                }
            },
            Some(old) => {
                debug!("Stale: {} ({} -> {})", source.display(), old, current);
                self.evict(source, &old).await;
                Lookup::Miss
            }
            None => Lookup::Miss,
        }
    }

    /// Remove a superseded artifact and its registry entry
    async fn evict(&self, source: &Path, old: &Fingerprint) {
        if let Err(e) = self.store.delete(old).await {
            warn!("Failed to evict artifact {}: {}", old, e);
        }
        self.registry.remove_if(source, old);
    }

    async fn reready_store(&self) {
        if let Err(e) = self.store.ensure_ready().await {
            warn!("Cache store not ready: {}", e);
        }
    }

    /// Transform the source and store the result under `current`
    async fn rebuild(
        &self,
        source: &Path,
        current: &Fingerprint,
        options: &TransformOptions,
    ) -> TranscacheResult<String> {
        let code = self
            .transformer
            .transform(source, options)
            .await
            .inspect_err(|e| match e {
                TranscacheError::TransformRejected(failure) => {
                    debug!("Transform rejected {}: {}", source.display(), failure)
                }
                other => warn!("Transform failed for {}: {}", source.display(), other),
            })?;

        match self.store.put(current, &code).await {
            Ok(()) => {
                self.registry.record(source, current.clone());
            }
            Err(e) => {
                // Not recorded as served, so the next request retries the write
                error!("Error saving artifact for {}: {}", source.display(), e);
                self.registry.remove_if(source, current);
            }
        }

        Ok(code)
    }
}

/// Turn a request path into a path relative to the source root
///
/// `.` segments and repeated separators are dropped, so every spelling of a
/// file resolves to the same path and therefore the same fingerprint.
fn normalize(request_path: &str) -> TranscacheResult<PathBuf> {
    let relative = Path::new(request_path.trim_start_matches('/'));

    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(TranscacheError::PathInvalid {
            path: request_path.to_string(),
            reason: "path must stay inside the source root".to_string(),
        });
    }

    let normalized: PathBuf = relative
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    if normalized.as_os_str().is_empty() {
        return Err(TranscacheError::PathInvalid {
            path: request_path.to_string(),
            reason: "empty path".to_string(),
        });
    }

    Ok(normalized)
}
