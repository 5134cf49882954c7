//! Response model produced by the cache orchestrator
//!
//! Transport-neutral: a status, the cache markers and a body. Front ends
//! render the markers as headers.

use crate::cache::fingerprint::Fingerprint;
use crate::error::TranscacheError;
use crate::transform::TransformFailure;
use serde::Serialize;
use std::io::ErrorKind;

pub const HEADER_CACHE: &str = "X-Transform-Cache";
pub const HEADER_HASH: &str = "X-Transform-Cache-Hash";
pub const HEADER_HIT: &str = "X-Transform-Cache-Hit";

/// Outcome status of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    BadRequest,
    Forbidden,
    NotFound,
    InternalError,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::InternalError => 500,
        }
    }

    /// Status for a failed request
    pub fn for_error(err: &TranscacheError) -> Self {
        match err {
            TranscacheError::PathInvalid { .. } => Self::BadRequest,
            TranscacheError::SourceIo { source, .. } => match source.kind() {
                ErrorKind::NotFound => Self::NotFound,
                ErrorKind::PermissionDenied => Self::Forbidden,
                _ => Self::InternalError,
            },
            _ => Self::InternalError,
        }
    }
}

/// Cache markers attached to a response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheMarkers {
    /// `Some(false)` when the request bypassed the cache
    pub cached: Option<bool>,
    pub fingerprint: Option<Fingerprint>,
    pub hit: Option<bool>,
}

impl CacheMarkers {
    pub fn bypassed() -> Self {
        Self {
            cached: Some(false),
            ..Self::default()
        }
    }

    pub fn cached(fingerprint: &Fingerprint) -> Self {
        Self {
            cached: Some(true),
            fingerprint: Some(fingerprint.clone()),
            hit: None,
        }
    }

    pub fn with_hit(mut self, hit: bool) -> Self {
        self.hit = Some(hit);
        self
    }

    pub fn is_bypassed(&self) -> bool {
        self.cached == Some(false)
    }

    pub fn is_hit(&self) -> bool {
        self.hit == Some(true)
    }

    /// Markers as header name/value pairs
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();
        if let Some(cached) = self.cached {
            headers.push((HEADER_CACHE, cached.to_string()));
        }
        if let Some(ref fingerprint) = self.fingerprint {
            headers.push((HEADER_HASH, fingerprint.to_string()));
        }
        if let Some(hit) = self.hit {
            headers.push((HEADER_HIT, hit.to_string()));
        }
        headers
    }
}

/// A served response
#[derive(Debug, Clone)]
pub struct Response {
    pub status: Status,
    pub markers: CacheMarkers,
    pub body: Vec<u8>,
}

impl Response {
    pub fn ok(markers: CacheMarkers, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            markers,
            body: body.into(),
        }
    }

    /// Render a failure
    ///
    /// With console errors enabled a transform failure becomes a script
    /// that logs the failure in the client console; anything else is a
    /// plain error body.
    pub fn error(markers: CacheMarkers, err: &TranscacheError, console_errors: bool) -> Self {
        if console_errors {
            if let TranscacheError::TransformRejected(failure) = err {
                return Self::ok(markers, console_script(failure));
            }
        }

        Self {
            status: Status::for_error(err),
            markers,
            body: err.to_string().into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Ok
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Script body that reports a transform failure in the client console
fn console_script(failure: &TransformFailure) -> String {
    let payload = serde_json::to_string(failure).unwrap_or_else(|_| "{}".to_string());
    let message = failure
        .to_string()
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('"', "\\\"")
        .replace('\n', "\\n");

    format!(
        "/* Transform error from transcache\n   See error console output for details. */\n\
         var output = {};\n\
         console.error(\"{}\", output.codeFrame);\n",
        payload, message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::Path;
    use std::time::UNIX_EPOCH;

    #[test]
    fn bypass_headers() {
        let headers = CacheMarkers::bypassed().headers();
        assert_eq!(headers, vec![(HEADER_CACHE, "false".to_string())]);
    }

    #[test]
    fn cached_headers_include_hash_and_hit() {
        let fp = Fingerprint::from_parts(Path::new("/a.js"), UNIX_EPOCH);
        let headers = CacheMarkers::cached(&fp).with_hit(true).headers();

        assert_eq!(headers.len(), 3);
        assert_eq!(headers[1], (HEADER_HASH, fp.to_string()));
        assert_eq!(headers[2], (HEADER_HIT, "true".to_string()));
    }

    #[test]
    fn source_errors_map_to_status() {
        let missing = TranscacheError::source_io("/a.js", io::Error::from(io::ErrorKind::NotFound));
        let denied =
            TranscacheError::source_io("/a.js", io::Error::from(io::ErrorKind::PermissionDenied));

        assert_eq!(Status::for_error(&missing), Status::NotFound);
        assert_eq!(Status::for_error(&denied), Status::Forbidden);
        assert_eq!(
            Status::for_error(&TranscacheError::TransformNotConfigured),
            Status::InternalError
        );
    }

    #[test]
    fn transform_failure_plain_is_500() {
        let err = TranscacheError::TransformRejected(TransformFailure::new("Unexpected token"));
        let response = Response::error(CacheMarkers::default(), &err, false);

        assert_eq!(response.status.code(), 500);
        assert!(response.body_text().contains("Unexpected token"));
    }

    #[test]
    fn transform_failure_console_script() {
        let failure = TransformFailure::new("Unexpected \"token\"").with_code_frame("> 1 | let");
        let err = TranscacheError::TransformRejected(failure);
        let response = Response::error(CacheMarkers::default(), &err, true);
        let body = response.body_text();

        assert!(response.is_success());
        assert!(body.contains("var output = {"));
        assert!(body.contains("\"codeFrame\":\"> 1 | let\""));
        assert!(body.contains("console.error(\"Unexpected \\\"token\\\"\", output.codeFrame);"));
    }

    #[test]
    fn io_error_ignores_console_mode() {
        let err = TranscacheError::source_io("/a.js", io::Error::from(io::ErrorKind::NotFound));
        let response = Response::error(CacheMarkers::default(), &err, true);
        assert_eq!(response.status, Status::NotFound);
    }
}
