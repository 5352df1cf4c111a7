// Demo pages: home and body echo

use hyper::body::{Body, Bytes};
use hyper::{Request, StatusCode};

use crate::config::AppState;
use crate::http::body::Payload;
use crate::http::response::{self, HttpResponse};

/// GET /: an HTML index of the demo endpoints
pub fn home(state: &AppState, is_head: bool) -> HttpResponse {
    let static_link = if state.config.static_files.enabled {
        let prefix = state.config.static_files.prefix.trim_end_matches('/');
        format!("<li><a href=\"{prefix}/\">{prefix}/</a>: static files</li>\n")
    } else {
        String::new()
    };

    let content = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{name}</title></head>
<body>
<h1>{name}</h1>
<ul>
<li><a href="/healthz">/healthz</a>: liveness check</li>
<li><a href="/cookies">/cookies</a>: cookies you sent</li>
<li><a href="/visits">/visits</a>: cookie visit counter</li>
<li><a href="/me">/me</a>: current session (POST /login, POST /logout)</li>
<li><a href="/api/notes">/api/notes</a>: notes API</li>
<li>POST /echo: parsed request body</li>
{static_link}</ul>
</body>
</html>
"#,
        name = state.config.http.server_name,
    );
    response::html(content, is_head)
}

/// POST /echo: decode the body by media type and send it back
pub async fn echo<B>(req: Request<B>, state: &AppState) -> HttpResponse
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    match Payload::from_request(&parts.headers, body, state.config.http.max_body_size).await {
        Ok(payload) => response::json(
            StatusCode::OK,
            &serde_json::json!({ "kind": payload.kind(), "data": payload.to_json() }),
        ),
        Err(e) => response::json_error(e.status(), &e.to_string()),
    }
}
