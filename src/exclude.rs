//! Request path exclusion
//!
//! Requests whose path matches one of the configured globs bypass the
//! cache and are served as raw files.

use crate::error::{TranscacheError, TranscacheResult};
use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled set of exclusion globs
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    patterns: Vec<Pattern>,
}

impl ExclusionSet {
    /// Compile glob patterns, rejecting invalid ones
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> TranscacheResult<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                Pattern::new(p).map_err(|e| TranscacheError::ExcludePattern {
                    pattern: p.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<TranscacheResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check a request path; surrounding slashes are ignored
    pub fn matches(&self, request_path: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let trimmed = request_path.trim_matches('/');
        self.patterns
            .iter()
            .any(|p| p.matches_with(trimmed, MATCH_OPTIONS))
    }

    /// Patterns as written, for logs
    pub fn describe(&self) -> String {
        self.patterns
            .iter()
            .map(Pattern::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
