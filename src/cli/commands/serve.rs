//! Serve command - run request paths through the cache

use crate::cache::{CacheOrchestrator, Response};
use crate::cli::args::{ResponseFormat, ServeArgs};
use crate::config::Config;
use crate::error::{TranscacheError, TranscacheResult};
use futures_util::future::join_all;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: &Config) -> TranscacheResult<()> {
    if args.paths.is_empty() && !args.stdin {
        return Err(TranscacheError::User(
            "No request paths given. Pass paths or use --stdin".to_string(),
        ));
    }

    let cache = Arc::new(CacheOrchestrator::from_config(config)?);

    if args.concurrent {
        let responses = join_all(args.paths.iter().map(|path| {
            let cache = Arc::clone(&cache);
            async move { cache.handle(path).await }
        }))
        .await;

        for (path, response) in args.paths.iter().zip(&responses) {
            emit(path, response, args.format)?;
        }
    } else {
        for path in &args.paths {
            let response = cache.handle(path).await;
            emit(path, &response, args.format)?;
        }
    }

    if args.stdin {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| TranscacheError::io("reading request paths from stdin", e))?
        {
            let path = line.trim();
            if path.is_empty() {
                continue;
            }
            let response = cache.handle(path).await;
            emit(path, &response, args.format)?;
        }
        debug!("Request stream closed");
    }

    Ok(())
}

fn emit(path: &str, response: &Response, format: ResponseFormat) -> TranscacheResult<()> {
    let rendered = match format {
        ResponseFormat::Full => render_full(path, response),
        ResponseFormat::Body => response.body_text(),
        ResponseFormat::Json => {
            let mut line = serde_json::to_string(&render_json(path, response))?;
            line.push('\n');
            line
        }
    };

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(rendered.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|e| TranscacheError::io("writing response", e))
}

/// Status line, headers, blank line, body
fn render_full(path: &str, response: &Response) -> String {
    let mut out = format!("{} {}\n", response.status.code(), path);
    for (name, value) in response.markers.headers() {
        out.push_str(&format!("{}: {}\n", name, value));
    }
    out.push('\n');
    out.push_str(&response.body_text());
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn render_json(path: &str, response: &Response) -> serde_json::Value {
    let headers: serde_json::Map<String, serde_json::Value> = response
        .markers
        .headers()
        .into_iter()
        .map(|(name, value)| (name.to_string(), serde_json::Value::String(value)))
        .collect();

    serde_json::json!({
        "path": path,
        "status": response.status.code(),
        "headers": headers,
        "body": response.body_text(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheMarkers, Fingerprint};
    use std::path::Path;
    use std::time::UNIX_EPOCH;

    fn hit_response() -> Response {
        let fp = Fingerprint::from_parts(Path::new("/src/foo.js"), UNIX_EPOCH);
        Response::ok(CacheMarkers::cached(&fp).with_hit(true), "let a = 1;")
    }

    #[test]
    fn full_rendering() {
        let rendered = render_full("/foo.js", &hit_response());
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "200 /foo.js");
        assert_eq!(lines[1], "X-Transform-Cache: true");
        assert!(lines[2].starts_with("X-Transform-Cache-Hash: "));
        assert_eq!(lines[3], "X-Transform-Cache-Hit: true");
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "let a = 1;");
    }

    #[test]
    fn json_rendering() {
        let value = render_json("/foo.js", &hit_response());

        assert_eq!(value["status"], 200);
        assert_eq!(value["headers"]["X-Transform-Cache-Hit"], "true");
        assert_eq!(value["body"], "let a = 1;");
    }
}
