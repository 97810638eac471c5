//! Development server.
//!
//! A `tiny_http` server over the published output directory:
//!
//! - Static file serving with `index.html` resolution for directories
//! - No directory listings: a directory without `index.html` is a 404
//! - No caching: every response tells the browser to revalidate
//! - File watching and auto-rebuild (via `watch` module)
//! - Graceful shutdown on Ctrl+C
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌──────────────┐
//! │   Main Thread   │     │   Watch Thread   │     │ Build Thread │
//! │  (HTTP Server)  │     │  (File Monitor)  │────▶│  (rebuilds)  │
//! └────────┬────────┘     └──────────────────┘     └──────┬───────┘
//!          │ read lock                                    │ publish (write lock)
//!          ▼                                              ▼
//!    ┌────────────────────────── OutputGate ───────────────────────┐
//!    │                         public/                             │
//!    └─────────────────────────────────────────────────────────────┘
//! ```

use crate::{config::SiteConfig, log, output::OutputGate, watch::spawn_watcher};
use anyhow::{Context, Result, anyhow};
use std::{
    borrow::Cow,
    fs,
    io::Cursor,
    net::{IpAddr, SocketAddr},
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tiny_http::{Header, Request, Response, Server, StatusCode};

const NO_CACHE_HEADERS: &[(&str, &str)] = &[
    ("Cache-Control", "no-cache, no-store, must-revalidate"),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
];

// ============================================================================
// Server Entry Point
// ============================================================================

/// Serve the output directory until Ctrl+C, rebuilding on change if enabled.
///
/// Binds once; an address already in use is an error.
pub fn serve_site(config: &'static SiteConfig, gate: &'static OutputGate) -> Result<()> {
    let interface: IpAddr = config
        .serve
        .interface
        .parse()
        .with_context(|| format!("Invalid interface `{}`", config.serve.interface))?;
    let addr = SocketAddr::new(interface, config.serve.port);

    let server = Server::http(addr).map_err(|e| anyhow!("Failed to bind {addr}: {e}"))?;
    let server = Arc::new(server);

    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    if config.serve.watch {
        spawn_watcher(config, gate)?;
    }

    log!("serve"; "http://{addr}");

    // Handle requests in main thread (blocks until Ctrl+C)
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, gate) {
            log!("serve"; "request error: {e}");
        }
    }

    Ok(())
}

// ============================================================================
// Request Handling
// ============================================================================

/// Where a request URL points inside the output directory.
#[derive(Debug, PartialEq, Eq)]
enum Resolved {
    File(PathBuf),
    NotFound,
}

/// Map a request URL to a file under `root`.
///
/// 1. Exact file match → that file
/// 2. Directory with `index.html` → the index
/// 3. Anything else, including `..` segments → not found
fn resolve(root: &Path, url: &str) -> Resolved {
    // Strip query string (e.g., ?t=123456) before decoding
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let decoded = urlencoding::decode(path).unwrap_or(Cow::Borrowed(path));
    let rel = Path::new(decoded.trim_matches('/'));

    if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
        return Resolved::NotFound;
    }

    let local = root.join(rel);
    if local.is_file() {
        return Resolved::File(local);
    }

    let index = local.join("index.html");
    if local.is_dir() && index.is_file() {
        return Resolved::File(index);
    }

    Resolved::NotFound
}

fn handle_request(request: Request, gate: &OutputGate) -> Result<()> {
    // Hold publishes off until the body is in memory.
    let body = {
        let _read = gate.read();
        match resolve(gate.output(), request.url()) {
            Resolved::File(path) => fs::read(&path)
                .map(|bytes| (bytes, guess_content_type(&path)))
                .ok(),
            Resolved::NotFound => None,
        }
    };

    match body {
        Some((bytes, content_type)) => serve_data(request, bytes, content_type),
        None => serve_not_found(request),
    }
}

// ============================================================================
// Response Helpers
// ============================================================================

fn header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes())
        .map_err(|()| anyhow!("invalid header `{name}: {value}`"))
}

fn no_cache_headers() -> Result<Vec<Header>> {
    NO_CACHE_HEADERS
        .iter()
        .map(|(name, value)| header(name, value))
        .collect()
}

/// Serve file content with a content type and no-cache headers.
fn serve_data(request: Request, content: Vec<u8>, content_type: &str) -> Result<()> {
    let mut response =
        Response::from_data(content).with_header(header("Content-Type", content_type)?);
    for h in no_cache_headers()? {
        response.add_header(h);
    }
    request.respond(response)?;
    Ok(())
}

/// Serve 404 Not Found response.
fn serve_not_found(request: Request) -> Result<()> {
    let mut headers = no_cache_headers()?;
    headers.push(header("Content-Type", "text/plain; charset=utf-8")?);
    let body = "404 Not Found";
    let response = Response::new(
        StatusCode(404),
        headers,
        Cursor::new(body),
        Some(body.len()),
        None,
    );
    request.respond(response)?;
    Ok(())
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        // Web content
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",

        // Images
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",

        // Documents
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",

        // Default binary
        _ => "application/octet-stream",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("posts/hello-world")).unwrap();
        fs::create_dir_all(dir.path().join("img")).unwrap();
        fs::write(dir.path().join("index.html"), "home").unwrap();
        fs::write(dir.path().join("posts/hello-world/index.html"), "post").unwrap();
        fs::write(dir.path().join("img/a b.png"), "png").unwrap();
        dir
    }

    #[test]
    fn test_resolve_root_index() {
        let dir = site();
        assert_eq!(resolve(dir.path(), "/"), Resolved::File(dir.path().join("index.html")));
    }

    #[test]
    fn test_resolve_directory_index() {
        let dir = site();
        let expected = Resolved::File(dir.path().join("posts/hello-world/index.html"));
        assert_eq!(resolve(dir.path(), "/posts/hello-world/"), expected);
        assert_eq!(resolve(dir.path(), "/posts/hello-world"), expected);
    }

    #[test]
    fn test_resolve_decodes_and_strips_query() {
        let dir = site();
        assert_eq!(
            resolve(dir.path(), "/img/a%20b.png?t=123"),
            Resolved::File(dir.path().join("img/a b.png"))
        );
    }

    #[test]
    fn test_directory_without_index_is_not_found() {
        let dir = site();
        assert_eq!(resolve(dir.path(), "/img/"), Resolved::NotFound);
        assert_eq!(resolve(dir.path(), "/posts/"), Resolved::NotFound);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = site();
        assert_eq!(resolve(dir.path(), "/nope.html"), Resolved::NotFound);
    }

    #[test]
    fn test_traversal_is_rejected() {
        let dir = site();
        let inner = dir.path().join("posts");
        assert_eq!(resolve(&inner, "/../index.html"), Resolved::NotFound);
        assert_eq!(resolve(&inner, "/%2e%2e/index.html"), Resolved::NotFound);
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type(Path::new("a.html")), "text/html; charset=utf-8");
        assert_eq!(guess_content_type(Path::new("a.CSS")), "text/css; charset=utf-8");
        assert_eq!(guess_content_type(Path::new("a.woff2")), "font/woff2");
        assert_eq!(guess_content_type(Path::new("a")), "application/octet-stream");
    }

    #[test]
    fn test_no_cache_headers_are_valid() {
        assert_eq!(no_cache_headers().unwrap().len(), 3);
    }
}
