//! HTTP response building module
//!
//! Builders for the responses the application sends. None of them panic:
//! a builder failure is logged and replaced by an empty response.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, SERVER};
use hyper::http::response::Builder;
use hyper::{Method, Response, StatusCode};
use serde::Serialize;

use super::cache::CachePolicy;
use crate::routing::allow_header;

pub type HttpResponse = Response<Full<Bytes>>;

/// Finish a builder, logging instead of panicking on failure
pub fn finish(builder: Builder, body: Bytes, what: &str) -> HttpResponse {
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error(what, &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Plain-text response, e.g. `404 Not Found`
pub fn text(status: StatusCode, body: impl Into<String>) -> HttpResponse {
    let body = body.into();
    finish(
        Response::builder()
            .status(status)
            .header("Content-Type", "text/plain; charset=utf-8")
            .header("Content-Length", body.len()),
        Bytes::from(body),
        status.as_str(),
    )
}

/// Default plain-text body for a status (`"404 Not Found"`)
pub fn status_text(status: StatusCode) -> HttpResponse {
    text(
        status,
        format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        ),
    )
}

/// HTML page; body omitted for `HEAD`
pub fn html(content: String, is_head: bool) -> HttpResponse {
    let content_length = content.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(content)
    };

    finish(
        Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "text/html; charset=utf-8")
            .header("Content-Length", content_length),
        body,
        "HTML",
    )
}

/// JSON response, pretty-printed like the management API used to
pub fn json<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    match serde_json::to_vec_pretty(body) {
        Ok(bytes) => finish(
            Response::builder()
                .status(status)
                .header("Content-Type", "application/json")
                .header("Content-Length", bytes.len())
                .header("Cache-Control", CachePolicy::NoStore.to_header_value()),
            Bytes::from(bytes),
            "JSON",
        ),
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize response: {e}"));
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// `{"error": message}` with the given status
pub fn json_error(status: StatusCode, message: &str) -> HttpResponse {
    let body = serde_json::json!({ "error": message }).to_string();
    finish(
        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .header("Content-Length", body.len()),
        Bytes::from(body),
        status.as_str(),
    )
}

/// 204 No Content
pub fn no_content() -> HttpResponse {
    finish(
        Response::builder().status(StatusCode::NO_CONTENT),
        Bytes::new(),
        "204",
    )
}

/// Redirect with a `Location` header
pub fn redirect(status: StatusCode, location: &str) -> HttpResponse {
    finish(
        Response::builder()
            .status(status)
            .header("Location", location)
            .header("Content-Type", "text/plain; charset=utf-8"),
        Bytes::from("Redirecting..."),
        status.as_str(),
    )
}

/// 405 Method Not Allowed listing the methods the path accepts
pub fn method_not_allowed(allow: &[Method]) -> HttpResponse {
    finish(
        Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .header("Content-Type", "text/plain; charset=utf-8")
            .header("Allow", allow_header(allow)),
        Bytes::from("405 Method Not Allowed"),
        "405",
    )
}

/// Build OPTIONS response (preflight request)
pub fn options(allow: &[Method], enable_cors: bool) -> HttpResponse {
    let allow = allow_header(allow);
    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Allow", &allow);

    if enable_cors {
        builder = builder
            .header("Access-Control-Allow-Methods", &allow)
            .header("Access-Control-Allow-Headers", "Content-Type, Range")
            .header("Access-Control-Max-Age", "86400");
    }

    finish(builder, Bytes::new(), "OPTIONS")
}

/// 304 Not Modified
pub fn not_modified(etag: &str, cache: CachePolicy) -> HttpResponse {
    finish(
        Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .header("ETag", etag)
            .header("Cache-Control", cache.to_header_value()),
        Bytes::new(),
        "304",
    )
}

/// 416 Range Not Satisfiable
pub fn range_not_satisfiable(size: usize) -> HttpResponse {
    finish(
        Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header("Content-Type", "text/plain; charset=utf-8")
            .header("Content-Range", format!("bytes */{size}")),
        Bytes::from("416 Range Not Satisfiable"),
        "416",
    )
}

/// Headers every response carries (`Server`, CORS origin)
pub fn apply_common_headers(resp: &mut HttpResponse, server_name: &str, enable_cors: bool) {
    let headers = resp.headers_mut();
    if let Ok(value) = HeaderValue::from_str(server_name) {
        headers.insert(SERVER, value);
    }
    if enable_cors {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    }
}

/// Log response build error
fn log_build_error(what: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {what} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_string(resp: HttpResponse) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_status_text() {
        let resp = status_text(StatusCode::NOT_FOUND);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(resp).await, "404 Not Found");
    }

    #[tokio::test]
    async fn test_json_error_shape() {
        let resp = json_error(StatusCode::BAD_REQUEST, "title is required");
        assert_eq!(resp.headers()["Content-Type"], "application/json");
        let value: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(value["error"], "title is required");
    }

    #[test]
    fn test_html_head_has_length_but_no_body() {
        let resp = html("<p>hi</p>".to_string(), true);
        assert_eq!(resp.headers()["Content-Length"], "9");
    }

    #[test]
    fn test_method_not_allowed_allow_header() {
        let resp = method_not_allowed(&[Method::GET, Method::HEAD, Method::OPTIONS]);
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["Allow"], "GET, HEAD, OPTIONS");
    }

    #[test]
    fn test_options_with_cors() {
        let resp = options(&[Method::GET, Method::OPTIONS], true);
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers()["Access-Control-Allow-Methods"], "GET, OPTIONS");

        let resp = options(&[Method::GET], false);
        assert!(resp.headers().get("Access-Control-Allow-Methods").is_none());
    }

    #[test]
    fn test_common_headers() {
        let mut resp = no_content();
        apply_common_headers(&mut resp, "plainhttp/test", true);
        assert_eq!(resp.headers()[SERVER], "plainhttp/test");
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[test]
    fn test_range_not_satisfiable() {
        let resp = range_not_satisfiable(42);
        assert_eq!(resp.headers()["Content-Range"], "bytes */42");
    }
}
