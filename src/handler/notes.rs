// Notes REST endpoints
// /api/notes and /api/notes/:id

use hyper::body::{Body, Bytes};
use hyper::{Request, StatusCode};

use crate::config::AppState;
use crate::http::body::Payload;
use crate::http::response::{self, HttpResponse};
use crate::logger;
use crate::notes::{NoteInput, StoreError};
use crate::routing::Params;

/// Map a store error to its JSON error response
fn store_error(err: &StoreError) -> HttpResponse {
    let status = err.status();
    if status.is_server_error() {
        logger::log_error(&format!("[Notes] {err}"));
        return response::json_error(status, "failed to access note storage");
    }
    response::json_error(status, &err.to_string())
}

/// `:id` as a note id, or a 400 response
fn note_id(params: &Params) -> Result<u64, HttpResponse> {
    params
        .get("id")
        .and_then(|raw| raw.parse::<u64>().ok())
        .ok_or_else(|| response::json_error(StatusCode::BAD_REQUEST, "note id must be a number"))
}

/// Pull `title`/`body` out of a decoded body
fn note_input(payload: &Payload) -> Result<NoteInput, HttpResponse> {
    match payload {
        Payload::Text(_) => Err(response::json_error(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "expected application/json or application/x-www-form-urlencoded",
        )),
        Payload::Json(value) if !value.is_object() => Err(response::json_error(
            StatusCode::BAD_REQUEST,
            "expected a JSON object",
        )),
        _ => {
            let field = |name: &str| -> Result<Option<String>, HttpResponse> {
                match payload.field(name) {
                    Some(v) => Ok(Some(v)),
                    None if payload.has_field(name) => Err(response::json_error(
                        StatusCode::BAD_REQUEST,
                        &format!("{name} must be a string"),
                    )),
                    None => Ok(None),
                }
            };
            Ok(NoteInput {
                title: field("title")?,
                body: field("body")?,
            })
        }
    }
}

async fn read_input<B>(req: Request<B>, state: &AppState) -> Result<NoteInput, HttpResponse>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    let payload = Payload::from_request(&parts.headers, body, state.config.http.max_body_size)
        .await
        .map_err(|e| response::json_error(e.status(), &e.to_string()))?;
    note_input(&payload)
}

/// GET /api/notes[?q=term]
pub async fn list(query: Option<&str>, state: &AppState) -> HttpResponse {
    let needle = query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty())
    });
    let notes = state.notes.list(needle.as_deref()).await;
    response::json(StatusCode::OK, &notes)
}

/// POST /api/notes
pub async fn create<B>(req: Request<B>, state: &AppState) -> HttpResponse
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let input = match read_input(req, state).await {
        Ok(input) => input,
        Err(resp) => return resp,
    };

    match state.notes.create(&input).await {
        Ok(note) => {
            logger::log_info(&format!("[Notes] Created note {}", note.id));
            let mut resp = response::json(StatusCode::CREATED, &note);
            if let Ok(location) = format!("/api/notes/{}", note.id).parse() {
                resp.headers_mut().insert("Location", location);
            }
            resp
        }
        Err(e) => store_error(&e),
    }
}

/// GET /api/notes/:id
pub async fn get(params: &Params, state: &AppState) -> HttpResponse {
    let id = match note_id(params) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.notes.get(id).await {
        Ok(note) => response::json(StatusCode::OK, &note),
        Err(e) => store_error(&e),
    }
}

/// PUT /api/notes/:id (partial: omitted fields keep their value)
pub async fn update<B>(req: Request<B>, params: &Params, state: &AppState) -> HttpResponse
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let id = match note_id(params) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let input = match read_input(req, state).await {
        Ok(input) => input,
        Err(resp) => return resp,
    };

    match state.notes.update(id, &input).await {
        Ok(note) => {
            logger::log_debug(&format!("[Notes] Updated note {id}"));
            response::json(StatusCode::OK, &note)
        }
        Err(e) => store_error(&e),
    }
}

/// DELETE /api/notes/:id
pub async fn delete(params: &Params, state: &AppState) -> HttpResponse {
    let id = match note_id(params) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.notes.delete(id).await {
        Ok(_) => {
            logger::log_info(&format!("[Notes] Deleted note {id}"));
            response::no_content()
        }
        Err(e) => store_error(&e),
    }
}

#[cfg(test)]
mod tests {
    use crate::handler::dispatch::tests::{body_string, request, send, test_config, test_state};
    use hyper::{Method, Request, StatusCode};
    use http_body_util::Full;
    use hyper::body::Bytes;
    use serde_json::Value;

    fn json_request(method: Method, uri: &str, body: &str) -> Request<Full<Bytes>> {
        let mut req = request(method, uri, body);
        req.headers_mut()
            .insert("content-type", "application/json".parse().unwrap());
        req
    }

    async fn json_body(resp: crate::http::HttpResponse) -> Value {
        serde_json::from_str(&body_string(resp).await).unwrap()
    }

    #[tokio::test]
    async fn test_notes_crud_flow() {
        let state = test_state(&test_config());

        let resp = send(&state, request(Method::GET, "/api/notes", "")).await;
        assert_eq!(json_body(resp).await, serde_json::json!([]));

        let resp = send(
            &state,
            json_request(Method::POST, "/api/notes", r#"{"title": "Groceries", "body": "milk"}"#),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers()["Location"], "/api/notes/1");
        let created = json_body(resp).await;
        assert_eq!(created["id"], 1);
        assert_eq!(created["title"], "Groceries");

        let resp = send(&state, request(Method::GET, "/api/notes/1", "")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["body"], "milk");

        let resp = send(
            &state,
            json_request(Method::PUT, "/api/notes/1", r#"{"body": "oat milk"}"#),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let updated = json_body(resp).await;
        assert_eq!(updated["title"], "Groceries");
        assert_eq!(updated["body"], "oat milk");

        let resp = send(&state, request(Method::DELETE, "/api/notes/1", "")).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = send(&state, request(Method::GET, "/api/notes/1", "")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(resp).await["error"], "note 1 not found");
    }

    #[tokio::test]
    async fn test_create_from_form_and_search() {
        let state = test_state(&test_config());

        for title in ["Buy milk", "Call Ada", "milkshake recipe"] {
            let mut req = request(Method::POST, "/api/notes", &format!("title={}", title.replace(' ', "+")));
            req.headers_mut().insert(
                "content-type",
                "application/x-www-form-urlencoded".parse().unwrap(),
            );
            let resp = send(&state, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let resp = send(&state, request(Method::GET, "/api/notes?q=MILK", "")).await;
        let list = json_body(resp).await;
        let titles: Vec<&str> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Buy milk", "milkshake recipe"]);

        let resp = send(&state, request(Method::GET, "/api/notes?q=", "")).await;
        assert_eq!(json_body(resp).await.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let state = test_state(&test_config());

        let resp = send(&state, json_request(Method::POST, "/api/notes", r#"{"body": "x"}"#)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(&state, json_request(Method::POST, "/api/notes", r#"{"title": 5}"#)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"], "title must be a string");

        let resp = send(&state, json_request(Method::POST, "/api/notes", "[1, 2]")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(&state, request(Method::POST, "/api/notes", "title=x")).await;
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let resp = send(&state, request(Method::GET, "/api/notes/abc", "")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(&state, json_request(Method::PUT, "/api/notes/9", r#"{"title": "x"}"#)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(&state, json_request(Method::PUT, "/api/notes/9", "{}")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_file_storage_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = test_config();
        cfg.notes.storage = crate::config::StorageKind::File;
        cfg.notes.file = dir.path().join("notes.json").to_string_lossy().into_owned();

        let state = std::sync::Arc::new(crate::config::AppState::new(&cfg).await.unwrap());
        let resp = send(&state, json_request(Method::POST, "/api/notes", r#"{"title": "kept"}"#)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        drop(state);

        let state = std::sync::Arc::new(crate::config::AppState::new(&cfg).await.unwrap());
        let resp = send(&state, request(Method::GET, "/api/notes/1", "")).await;
        assert_eq!(json_body(resp).await["title"], "kept");
    }
}
