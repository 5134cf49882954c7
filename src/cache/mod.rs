//! Request-time transformation cache
//!
//! Serves transformed source files, rebuilding an artifact only when the
//! source file's fingerprint changes.
//!
//! # Components
//!
//! | Module | Role |
//! |--------|------|
//! | `fingerprint` | path + mtime identifier of a source file state |
//! | `store` | artifact storage, in memory or in a directory |
//! | `registry` | last-served fingerprint per source path |
//! | `orchestrator` | hit / miss / stale decisions and eviction |
//! | `response` | status, cache markers and body |

pub mod fingerprint;
pub mod orchestrator;
pub mod registry;
pub mod response;
pub mod store;

pub use fingerprint::{fingerprint, Fingerprint};
pub use orchestrator::{CacheOrchestrator, CacheSettings};
pub use registry::FingerprintRegistry;
pub use response::{CacheMarkers, Response, Status};
pub use store::{create_store, ArtifactInfo, ArtifactStore, DirectoryStore, MemoryStore};
