//! Static file serving module
//!
//! Maps a URL prefix onto a directory: index files, traversal protection,
//! MIME detection, `ETag`/`Last-Modified` revalidation and byte ranges.

use hyper::body::Bytes;
use hyper::{Method, Response, StatusCode};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

use super::dispatch::RequestContext;
use crate::config::StaticConfig;
use crate::http::cache::{self, CachePolicy};
use crate::http::range::{self, RangeOutcome};
use crate::http::response::{self, HttpResponse};
use crate::http::mime;
use crate::logger;

const FAVICON_PATH: &str = "/favicon.ico";
const STATIC_METHODS: [Method; 3] = [Method::GET, Method::HEAD, Method::OPTIONS];

/// Where a request path led on disk
#[derive(Debug, PartialEq, Eq)]
pub enum Resolved {
    File(PathBuf),
    /// Directory addressed without a trailing slash
    AddSlash,
    NotFound,
    /// Escapes the root (`..`, NUL byte, symlink out of the tree)
    Forbidden,
}

/// Serve the request if it belongs to the static mount; `None` lets routing continue
pub async fn try_serve(
    ctx: &RequestContext<'_>,
    cfg: &StaticConfig,
    enable_cors: bool,
) -> Option<HttpResponse> {
    if !cfg.enabled {
        return None;
    }

    if ctx.path == FAVICON_PATH && matches!(*ctx.method, Method::GET | Method::HEAD) {
        return Some(serve_relative(ctx, cfg, FAVICON_PATH).await);
    }

    let prefix = cfg.prefix.trim_end_matches('/');
    let rest = if prefix.is_empty() {
        ctx.path
    } else if ctx.path == prefix {
        ""
    } else {
        ctx.path.strip_prefix(prefix).filter(|r| r.starts_with('/'))?
    };
    let root_mount = prefix.is_empty();

    match *ctx.method {
        Method::GET | Method::HEAD => {}
        // A root mount must not shadow the route table for other methods
        _ if root_mount => return None,
        Method::OPTIONS => return Some(response::options(&STATIC_METHODS, enable_cors)),
        _ => return Some(response::method_not_allowed(&STATIC_METHODS)),
    }

    match resolve(Path::new(&cfg.root), rest, &cfg.index_files).await {
        Resolved::File(path) => Some(serve_file(ctx, &path, cfg.max_age).await),
        Resolved::AddSlash => {
            let location = match ctx.query {
                Some(query) => format!("{}/?{query}", ctx.path),
                None => format!("{}/", ctx.path),
            };
            Some(response::redirect(StatusCode::MOVED_PERMANENTLY, &location))
        }
        Resolved::NotFound if root_mount => None,
        Resolved::NotFound => Some(response::status_text(StatusCode::NOT_FOUND)),
        Resolved::Forbidden => {
            logger::log_warning(&format!("Path traversal attempt blocked: {}", ctx.path));
            Some(response::status_text(StatusCode::NOT_FOUND))
        }
    }
}

async fn serve_relative(ctx: &RequestContext<'_>, cfg: &StaticConfig, rest: &str) -> HttpResponse {
    match resolve(Path::new(&cfg.root), rest, &cfg.index_files).await {
        Resolved::File(path) => serve_file(ctx, &path, cfg.max_age).await,
        _ => response::status_text(StatusCode::NOT_FOUND),
    }
}

/// Resolve a path below the mount point to a file under `root`
pub async fn resolve(root: &Path, rest: &str, index_files: &[String]) -> Resolved {
    let Ok(decoded) = urlencoding::decode(rest) else {
        return Resolved::NotFound;
    };
    if decoded.contains('\0') {
        return Resolved::Forbidden;
    }

    let mut candidate = root.to_path_buf();
    for segment in decoded.split('/').filter(|s| !s.is_empty() && *s != ".") {
        // Anything other than a plain name (`..`, `C:`, `\`) is refused
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if !segment.contains('\\') => {
                candidate.push(name);
            }
            _ => return Resolved::Forbidden,
        }
    }

    let Ok(meta) = fs::metadata(&candidate).await else {
        return Resolved::NotFound;
    };

    if meta.is_dir() {
        // "/static" or "/static/docs": redirect so relative links resolve
        if !rest.ends_with('/') {
            return Resolved::AddSlash;
        }
        let mut found = None;
        for index in index_files {
            let path = candidate.join(index);
            if fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
                found = Some(path);
                break;
            }
        }
        let Some(index_path) = found else {
            return Resolved::NotFound;
        };
        candidate = index_path;
    }

    // Symlinks may still point outside the root
    let (Ok(root_canonical), Ok(file_canonical)) = (
        fs::canonicalize(root).await,
        fs::canonicalize(&candidate).await,
    ) else {
        return Resolved::NotFound;
    };
    if !file_canonical.starts_with(&root_canonical) {
        return Resolved::Forbidden;
    }

    Resolved::File(candidate)
}

/// Read a file and answer with 200, 206, 304 or 416
async fn serve_file(ctx: &RequestContext<'_>, path: &Path, max_age: u32) -> HttpResponse {
    let content = match fs::read(path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!("Failed to read file '{}': {e}", path.display()));
            return response::status_text(StatusCode::NOT_FOUND);
        }
    };
    let modified = fs::metadata(path)
        .await
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH);

    build_file_response(ctx, &content, mime::content_type_for(path), modified, CachePolicy::Public(max_age))
}

/// Build static file response with `ETag`, `Last-Modified` and Range support
fn build_file_response(
    ctx: &RequestContext<'_>,
    data: &[u8],
    content_type: &str,
    modified: SystemTime,
    cache_policy: CachePolicy,
) -> HttpResponse {
    let etag = cache::generate_etag(data);
    let total = data.len();

    // If-None-Match takes precedence over If-Modified-Since
    let not_modified = match ctx.if_none_match.as_deref() {
        Some(inm) => cache::check_etag_match(Some(inm), &etag),
        None => cache::not_modified_since(ctx.if_modified_since.as_deref(), modified),
    };
    if not_modified {
        return response::not_modified(&etag, cache_policy);
    }

    let (status, slice, content_range) = match range::evaluate(ctx.range_header.as_deref(), total) {
        RangeOutcome::Partial(r) => (
            StatusCode::PARTIAL_CONTENT,
            &data[r.start..r.start + r.byte_count()],
            Some(r.content_range(total)),
        ),
        RangeOutcome::Unsatisfiable => return response::range_not_satisfiable(total),
        RangeOutcome::Full => (StatusCode::OK, data, None),
    };

    let mut builder = Response::builder()
        .status(status)
        .header("Content-Type", content_type)
        .header("Content-Length", slice.len())
        .header("Accept-Ranges", "bytes")
        .header("ETag", &etag)
        .header("Last-Modified", cache::last_modified(modified))
        .header("Cache-Control", cache_policy.to_header_value());
    if let Some(content_range) = content_range {
        builder = builder.header("Content-Range", content_range);
    }

    let body = if ctx.is_head {
        Bytes::new()
    } else {
        Bytes::copy_from_slice(slice)
    };
    response::finish(builder, body, status.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::dispatch::tests::{body_string, request, send, test_config, test_state};

    struct Site {
        dir: tempfile::TempDir,
    }

    impl Site {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("hello.txt"), "hello static world").unwrap();
            std::fs::write(dir.path().join("favicon.ico"), [0u8, 1, 2, 3]).unwrap();
            std::fs::create_dir(dir.path().join("docs")).unwrap();
            std::fs::write(dir.path().join("docs").join("index.html"), "<h1>docs</h1>").unwrap();
            std::fs::create_dir(dir.path().join("empty")).unwrap();
            Self { dir }
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn state(&self) -> std::sync::Arc<crate::config::AppState> {
            let mut cfg = test_config();
            cfg.static_files.root = self.root().to_string_lossy().into_owned();
            test_state(&cfg)
        }
    }

    fn index() -> Vec<String> {
        vec!["index.html".to_string()]
    }

    #[tokio::test]
    async fn test_resolve() {
        let site = Site::new();
        let root = site.root();
        assert_eq!(
            resolve(root, "/hello.txt", &index()).await,
            Resolved::File(root.join("hello.txt"))
        );
        assert_eq!(
            resolve(root, "/docs/", &index()).await,
            Resolved::File(root.join("docs").join("index.html"))
        );
        assert_eq!(resolve(root, "/docs", &index()).await, Resolved::AddSlash);
        assert_eq!(resolve(root, "", &index()).await, Resolved::AddSlash);
        assert_eq!(resolve(root, "/empty/", &index()).await, Resolved::NotFound);
        assert_eq!(resolve(root, "/nope.txt", &index()).await, Resolved::NotFound);
        assert_eq!(resolve(root, "/../etc/passwd", &index()).await, Resolved::Forbidden);
        assert_eq!(resolve(root, "/docs/%2e%2e/%2e%2e/x", &index()).await, Resolved::Forbidden);
        assert_eq!(resolve(root, "/a%00b", &index()).await, Resolved::Forbidden);
    }

    #[tokio::test]
    async fn test_serves_file_with_validators() {
        let site = Site::new();
        let state = site.state();

        let resp = send(&state, request(Method::GET, "/static/hello.txt", "")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Type"], "text/plain; charset=utf-8");
        assert_eq!(resp.headers()["Accept-Ranges"], "bytes");
        assert_eq!(resp.headers()["Cache-Control"], "public, max-age=3600");
        assert!(resp.headers().contains_key("Last-Modified"));
        let etag = resp.headers()["ETag"].to_str().unwrap().to_string();
        assert_eq!(body_string(resp).await, "hello static world");

        let mut req = request(Method::GET, "/static/hello.txt", "");
        req.headers_mut().insert("if-none-match", etag.parse().unwrap());
        let resp = send(&state, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_range_requests() {
        let site = Site::new();
        let state = site.state();

        let mut req = request(Method::GET, "/static/hello.txt", "");
        req.headers_mut().insert("range", "bytes=0-4".parse().unwrap());
        let resp = send(&state, req).await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers()["Content-Range"], "bytes 0-4/18");
        assert_eq!(body_string(resp).await, "hello");

        let mut req = request(Method::GET, "/static/hello.txt", "");
        req.headers_mut().insert("range", "bytes=100-".parse().unwrap());
        let resp = send(&state, req).await;
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(resp.headers()["Content-Range"], "bytes */18");
    }

    #[tokio::test]
    async fn test_directory_redirect_and_index() {
        let site = Site::new();
        let state = site.state();

        let resp = send(&state, request(Method::GET, "/static/docs", "")).await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()["Location"], "/static/docs/");

        let resp = send(&state, request(Method::GET, "/static/docs?lang=en&page=2", "")).await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()["Location"], "/static/docs/?lang=en&page=2");

        let resp = send(&state, request(Method::GET, "/static/docs/", "")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Type"], "text/html; charset=utf-8");
        assert_eq!(body_string(resp).await, "<h1>docs</h1>");
    }

    #[tokio::test]
    async fn test_head_and_methods() {
        let site = Site::new();
        let state = site.state();

        let resp = send(&state, request(Method::HEAD, "/static/hello.txt", "")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Length"], "18");
        assert!(body_string(resp).await.is_empty());

        let resp = send(&state, request(Method::POST, "/static/hello.txt", "")).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["Allow"], "GET, HEAD, OPTIONS");

        let resp = send(&state, request(Method::OPTIONS, "/static/hello.txt", "")).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_missing_and_traversal_are_404() {
        let site = Site::new();
        let state = site.state();

        let resp = send(&state, request(Method::GET, "/static/missing.css", "")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(&state, request(Method::GET, "/static/%2e%2e/secret", "")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        // prefix must end at a segment boundary
        let resp = send(&state, request(Method::GET, "/staticky", "")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_favicon() {
        let site = Site::new();
        let state = site.state();
        let resp = send(&state, request(Method::GET, "/favicon.ico", "")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Type"], "image/x-icon");
    }

    #[tokio::test]
    async fn test_root_mount_falls_through_to_routes() {
        let site = Site::new();
        let mut cfg = test_config();
        cfg.static_files.root = site.root().to_string_lossy().into_owned();
        cfg.static_files.prefix = "/".to_string();
        let state = test_state(&cfg);

        let resp = send(&state, request(Method::GET, "/hello.txt", "")).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&state, request(Method::GET, "/healthz", "")).await;
        assert_eq!(body_string(resp).await, "ok");
    }
}
