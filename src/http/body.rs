//! Request body module
//!
//! Reads a body stream to completion under a size limit and decodes it
//! according to its media type.

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::StatusCode;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// Errors raised while reading or decoding a request body
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("failed to read request body: {0}")]
    Read(String),
    #[error("request body is not valid UTF-8")]
    InvalidUtf8,
    #[error("invalid JSON: {0}")]
    BadJson(#[from] serde_json::Error),
    #[error("invalid form body: {0}")]
    BadForm(String),
    #[error("unsupported media type '{0}'")]
    UnsupportedMediaType(String),
}

impl BodyError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Read(_) | Self::InvalidUtf8 | Self::BadJson(_) | Self::BadForm(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

/// Declared `Content-Length`, if present and numeric
pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Media type without parameters, lowercased (`text/plain; charset=utf-8` -> `text/plain`)
pub fn media_type(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let essence = raw.split(';').next().unwrap_or_default().trim();
    if essence.is_empty() {
        None
    } else {
        Some(essence.to_ascii_lowercase())
    }
}

/// Collect the whole body, failing once more than `limit` bytes arrive
pub async fn read_body<B>(body: B, limit: u64) -> Result<Bytes, BodyError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let cap = usize::try_from(limit).unwrap_or(usize::MAX);
    match Limited::new(body, cap).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(BodyError::TooLarge { limit })
        }
        Err(e) => Err(BodyError::Read(e.to_string())),
    }
}

/// Collect the body and decode it as UTF-8
pub async fn read_text<B>(body: B, limit: u64) -> Result<String, BodyError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = read_body(body, limit).await?;
    String::from_utf8(bytes.to_vec()).map_err(|_| BodyError::InvalidUtf8)
}

pub fn parse_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, BodyError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Decode `application/x-www-form-urlencoded`; later duplicates are kept in order
pub fn parse_form(bytes: &[u8]) -> Result<Vec<(String, String)>, BodyError> {
    if std::str::from_utf8(bytes).is_err() {
        return Err(BodyError::BadForm("body is not valid UTF-8".to_string()));
    }
    Ok(url::form_urlencoded::parse(bytes)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect())
}

/// A decoded request body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    /// First value wins for repeated keys
    Form(BTreeMap<String, String>),
    Text(String),
}

impl Payload {
    /// Read and decode a body based on the request's `Content-Type`
    pub async fn from_request<B>(headers: &HeaderMap, body: B, limit: u64) -> Result<Self, BodyError>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        if content_length(headers).is_some_and(|len| len > limit) {
            return Err(BodyError::TooLarge { limit });
        }

        let media = media_type(headers);
        match media.as_deref() {
            Some("application/json") => {
                let bytes = read_body(body, limit).await?;
                Ok(Self::Json(parse_json(&bytes)?))
            }
            Some("application/x-www-form-urlencoded") => {
                let bytes = read_body(body, limit).await?;
                let mut map = BTreeMap::new();
                for (k, v) in parse_form(&bytes)? {
                    map.entry(k).or_insert(v);
                }
                Ok(Self::Form(map))
            }
            None => Ok(Self::Text(read_text(body, limit).await?)),
            Some(m) if m.starts_with("text/") => Ok(Self::Text(read_text(body, limit).await?)),
            Some(other) => Err(BodyError::UnsupportedMediaType(other.to_string())),
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Form(_) => "form",
            Self::Text(_) => "text",
        }
    }

    /// Look up a string field in a JSON object or form
    pub fn field(&self, name: &str) -> Option<String> {
        match self {
            Self::Json(value) => value.get(name).and_then(|v| v.as_str()).map(str::to_string),
            Self::Form(map) => map.get(name).cloned(),
            Self::Text(_) => None,
        }
    }

    /// Whether a field is present at all (even as `null` or empty)
    pub fn has_field(&self, name: &str) -> bool {
        match self {
            Self::Json(value) => value.get(name).is_some(),
            Self::Form(map) => map.contains_key(name),
            Self::Text(_) => false,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Json(value) => value.clone(),
            Self::Form(map) => serde_json::json!(map),
            Self::Text(text) => serde_json::Value::String(text.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use hyper::header::HeaderValue;

    fn headers(content_type: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(ct) = content_type {
            map.insert(CONTENT_TYPE, HeaderValue::from_str(ct).unwrap());
        }
        map
    }

    fn body(data: &'static [u8]) -> Full<Bytes> {
        Full::new(Bytes::from_static(data))
    }

    #[tokio::test]
    async fn test_read_body_within_limit() {
        let bytes = read_body(body(b"hello"), 5).await.unwrap();
        assert_eq!(&bytes[..], b"hello");
    }

    #[tokio::test]
    async fn test_read_body_too_large() {
        let err = read_body(body(b"hello world"), 5).await.unwrap_err();
        assert!(matches!(err, BodyError::TooLarge { limit: 5 }));
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_read_text_rejects_invalid_utf8() {
        let err = read_text(body(&[0xff, 0xfe]), 16).await.unwrap_err();
        assert!(matches!(err, BodyError::InvalidUtf8));
    }

    #[tokio::test]
    async fn test_payload_json() {
        let payload = Payload::from_request(
            &headers(Some("application/json; charset=utf-8")),
            body(br#"{"title":"hi","n":1}"#),
            1024,
        )
        .await
        .unwrap();
        assert_eq!(payload.kind(), "json");
        assert_eq!(payload.field("title").as_deref(), Some("hi"));
        assert_eq!(payload.field("n"), None);
        assert!(payload.has_field("n"));
    }

    #[tokio::test]
    async fn test_payload_empty_json_is_error() {
        let err = Payload::from_request(&headers(Some("application/json")), body(b""), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, BodyError::BadJson(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_payload_form() {
        let payload = Payload::from_request(
            &headers(Some("application/x-www-form-urlencoded")),
            body(b"username=ada+lovelace&x=%26&username=second"),
            1024,
        )
        .await
        .unwrap();
        assert_eq!(payload.field("username").as_deref(), Some("ada lovelace"));
        assert_eq!(payload.field("x").as_deref(), Some("&"));
    }

    #[tokio::test]
    async fn test_payload_text_and_missing_type() {
        let payload = Payload::from_request(&headers(None), body(b"plain"), 1024)
            .await
            .unwrap();
        assert_eq!(payload, Payload::Text("plain".to_string()));

        let payload = Payload::from_request(&headers(Some("text/csv")), body(b""), 1024)
            .await
            .unwrap();
        assert_eq!(payload, Payload::Text(String::new()));
    }

    #[tokio::test]
    async fn test_payload_unsupported() {
        let err = Payload::from_request(&headers(Some("image/png")), body(b"x"), 1024)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_declared_length_checked_before_reading() {
        let mut map = headers(Some("text/plain"));
        map.insert(CONTENT_LENGTH, HeaderValue::from_static("4096"));
        let err = Payload::from_request(&map, body(b"small"), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, BodyError::TooLarge { limit: 1024 }));
    }

    #[test]
    fn test_media_type() {
        assert_eq!(
            media_type(&headers(Some("Application/JSON ; charset=UTF-8"))).as_deref(),
            Some("application/json")
        );
        assert_eq!(media_type(&headers(None)), None);
    }
}
