// Cookie and session endpoints
// /cookies, /visits, /login, /me, /logout

use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, HeaderValue, SET_COOKIE};
use hyper::{Request, StatusCode};
use serde::Serialize;

use crate::config::{AppState, CookieConfig};
use crate::http::body::Payload;
use crate::http::cookie::{request_cookies, SameSite, SetCookie};
use crate::http::response::{self, HttpResponse};
use crate::logger;

const VISITS_COOKIE: &str = "visits";
/// One year
const VISITS_MAX_AGE: i64 = 31_536_000;
const USERNAME_MAX_CHARS: usize = 64;

#[derive(Serialize)]
struct SessionView<'a> {
    username: &'a str,
    expires_at: String,
}

/// Append a `Set-Cookie` header
fn set_cookie(resp: &mut HttpResponse, cookie: &SetCookie) {
    match HeaderValue::from_str(&cookie.to_header_value()) {
        Ok(value) => {
            resp.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => logger::log_error(&format!(
            "Failed to encode cookie '{}': {e}",
            cookie.name()
        )),
    }
}

/// GET /cookies: echo the cookies the client sent
pub fn list(headers: &HeaderMap) -> HttpResponse {
    response::json(StatusCode::OK, &request_cookies(headers))
}

/// GET /visits: per-client counter kept entirely in a cookie
pub fn visits(headers: &HeaderMap, cfg: &CookieConfig) -> HttpResponse {
    let previous = request_cookies(headers)
        .get(VISITS_COOKIE)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);
    let count = previous.saturating_add(1);

    let mut resp = response::json(StatusCode::OK, &serde_json::json!({ "visits": count }));
    let cookie = SetCookie::new(VISITS_COOKIE, count.to_string())
        .path("/")
        .max_age(VISITS_MAX_AGE)
        .same_site(SameSite::Lax)
        .secure(cfg.secure);
    set_cookie(&mut resp, &cookie);
    resp
}

/// POST /login: start a session for `username` (JSON or form body)
pub async fn login<B>(req: Request<B>, state: &AppState) -> HttpResponse
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    let payload =
        match Payload::from_request(&parts.headers, body, state.config.http.max_body_size).await {
            Ok(p) => p,
            Err(e) => return response::json_error(e.status(), &e.to_string()),
        };

    let username = payload.field("username").unwrap_or_default();
    let username = username.trim();
    if username.is_empty() {
        return response::json_error(StatusCode::BAD_REQUEST, "username is required");
    }
    if username.chars().count() > USERNAME_MAX_CHARS {
        return response::json_error(
            StatusCode::BAD_REQUEST,
            &format!("username must be at most {USERNAME_MAX_CHARS} characters"),
        );
    }

    let cfg = &state.config.cookies;
    let Some(session) = state.sessions.create(username).await else {
        logger::log_error("[Session] Session expiry out of range, check cookies.session_max_age");
        return response::json_error(StatusCode::INTERNAL_SERVER_ERROR, "could not start session");
    };
    logger::log_info(&format!("[Session] '{}' logged in", session.username));

    let mut resp = response::json(
        StatusCode::OK,
        &SessionView {
            username: &session.username,
            expires_at: session.expires_at.to_rfc3339(),
        },
    );
    let cookie = SetCookie::new(&cfg.session_name, &session.id)
        .path("/")
        .max_age(state.sessions.ttl().num_seconds())
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(cfg.secure);
    set_cookie(&mut resp, &cookie);
    resp
}

/// GET /me: who the session cookie belongs to
pub async fn me(headers: &HeaderMap, state: &AppState) -> HttpResponse {
    let Some(id) = request_cookies(headers).remove(&state.config.cookies.session_name) else {
        return response::json_error(StatusCode::UNAUTHORIZED, "not logged in");
    };
    match state.sessions.get(&id).await {
        Some(session) => response::json(
            StatusCode::OK,
            &SessionView {
                username: &session.username,
                expires_at: session.expires_at.to_rfc3339(),
            },
        ),
        None => response::json_error(StatusCode::UNAUTHORIZED, "session expired or unknown"),
    }
}

/// POST /logout: drop the session and clear the cookie
pub async fn logout(headers: &HeaderMap, state: &AppState) -> HttpResponse {
    let name = &state.config.cookies.session_name;
    if let Some(id) = request_cookies(headers).remove(name) {
        if state.sessions.remove(&id).await {
            logger::log_debug("[Session] Session ended by logout");
        }
    }

    let mut resp = response::no_content();
    set_cookie(
        &mut resp,
        &SetCookie::removal(name).secure(state.config.cookies.secure),
    );
    resp
}
