//! Request dispatch module
//!
//! Entry point for HTTP request processing: size checks, static files,
//! route table lookup and endpoint dispatch, plus the access log line.

use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, RANGE, REFERER, USER_AGENT};
use hyper::{Method, Request, StatusCode, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::{cookies, notes, pages, static_files, Endpoint};
use crate::config::AppState;
use crate::http::body::content_length;
use crate::http::response::{self, HttpResponse};
use crate::logger::{self, AccessLogEntry};
use crate::routing::{Lookup, Params};

/// Request data needed before the body is consumed
pub struct RequestContext<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
    pub range_header: Option<String>,
}

impl<'a> RequestContext<'a> {
    fn from_request<B>(req: &'a Request<B>) -> Self {
        let headers = req.headers();
        Self {
            method: req.method(),
            path: req.uri().path(),
            query: req.uri().query(),
            is_head: req.method() == Method::HEAD,
            if_none_match: header_string(headers, &IF_NONE_MATCH),
            if_modified_since: header_string(headers, &IF_MODIFIED_SINCE),
            range_header: header_string(headers, &RANGE),
        }
    }
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote: SocketAddr,
) -> Result<HttpResponse, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let access_log = state.access_log_enabled();

    let mut entry = access_log.then(|| {
        let mut entry = AccessLogEntry::new(remote, req.method().as_str(), req.uri().path());
        entry.query = req.uri().query().map(str::to_string);
        entry.http_version = version_label(req.version()).to_string();
        entry.referer = header_string(req.headers(), &REFERER);
        entry.user_agent = header_string(req.headers(), &USER_AGENT);
        entry
    });

    let mut resp = route_request(req, &state).await;
    let http = &state.config.http;
    response::apply_common_headers(&mut resp, &http.server_name, http.enable_cors);

    if let Some(entry) = entry.as_mut() {
        entry.status = resp.status().as_u16();
        entry.body_bytes = resp
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.duration = started.elapsed();
        logger::log_access(entry, &state.config.logging.access_log_format);
    }

    Ok(resp)
}

/// Route request based on path and configuration
async fn route_request<B>(req: Request<B>, state: &AppState) -> HttpResponse
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let max_body_size = state.config.http.max_body_size;

    // 1. Reject oversized bodies before reading them
    if let Some(size) = content_length(req.headers()).filter(|&n| n > max_body_size) {
        logger::log_warning(&format!(
            "Request body too large: {size} bytes (max: {max_body_size})"
        ));
        return response::json_error(
            StatusCode::PAYLOAD_TOO_LARGE,
            &format!("request body exceeds {max_body_size} bytes"),
        );
    }

    // 2. Static files and favicon
    {
        let ctx = RequestContext::from_request(&req);
        if let Some(resp) =
            static_files::try_serve(&ctx, &state.config.static_files, state.config.http.enable_cors)
                .await
        {
            return resp;
        }
    }

    // 3. Route table
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if method == Method::OPTIONS {
        let allow = state.router.allowed_methods(&path);
        if allow.is_empty() {
            return not_found(&path);
        }
        return response::options(&allow, state.config.http.enable_cors);
    }

    match state.router.lookup(&method, &path) {
        Lookup::Found { endpoint, params } => dispatch(endpoint, req, &params, state).await,
        Lookup::MethodNotAllowed { allow } => {
            logger::log_debug(&format!("Method not allowed: {method} {path}"));
            response::method_not_allowed(&allow)
        }
        Lookup::NotFound => not_found(&path),
    }
}

/// JSON 404 under `/api`, plain text elsewhere
fn not_found(path: &str) -> HttpResponse {
    if path.starts_with("/api/") {
        response::json_error(StatusCode::NOT_FOUND, "no such resource")
    } else {
        response::status_text(StatusCode::NOT_FOUND)
    }
}

/// Dispatch to specific endpoint handler
async fn dispatch<B>(
    endpoint: Endpoint,
    req: Request<B>,
    params: &Params,
    state: &AppState,
) -> HttpResponse
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let is_head = req.method() == Method::HEAD;
    match endpoint {
        Endpoint::Home => pages::home(state, is_head),
        Endpoint::Health => response::text(StatusCode::OK, "ok"),
        Endpoint::Echo => pages::echo(req, state).await,
        Endpoint::Cookies => cookies::list(req.headers()),
        Endpoint::Visits => cookies::visits(req.headers(), &state.config.cookies),
        Endpoint::Login => cookies::login(req, state).await,
        Endpoint::Logout => cookies::logout(req.headers(), state).await,
        Endpoint::Me => cookies::me(req.headers(), state).await,
        Endpoint::ListNotes => notes::list(req.uri().query(), state).await,
        Endpoint::CreateNote => notes::create(req, state).await,
        Endpoint::GetNote => notes::get(params, state).await,
        Endpoint::UpdateNote => notes::update(req, params, state).await,
        Endpoint::DeleteNote => notes::delete(params, state).await,
    }
}
