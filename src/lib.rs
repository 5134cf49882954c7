//! transcache - request-time transformation cache
//!
//! Serves source files through an external transform, caching each
//! transformed artifact until the source file changes.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod exclude;
pub mod transform;

pub use error::{TranscacheError, TranscacheResult};
