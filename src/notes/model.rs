// Note data types and validation rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::store::StoreError;

pub const TITLE_MAX_CHARS: usize = 200;
pub const BODY_MAX_CHARS: usize = 10_000;

/// A stored note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Case-insensitive substring match on title or body
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.title.to_lowercase().contains(&needle) || self.body.to_lowercase().contains(&needle)
    }
}

/// Fields supplied by a client; `None` means "not given"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteInput {
    pub title: Option<String>,
    pub body: Option<String>,
}

impl NoteInput {
    /// Validated `(title, body)` for a new note
    pub fn for_create(&self) -> Result<(String, String), StoreError> {
        let title = self
            .title
            .as_deref()
            .ok_or_else(|| StoreError::Invalid("title is required".to_string()))?;
        Ok((
            clean_title(title)?,
            clean_body(self.body.as_deref().unwrap_or_default())?,
        ))
    }

    /// Validated partial update; at least one field must be present
    pub fn for_update(&self) -> Result<(Option<String>, Option<String>), StoreError> {
        if self.title.is_none() && self.body.is_none() {
            return Err(StoreError::Invalid(
                "nothing to update: give title and/or body".to_string(),
            ));
        }
        let title = self.title.as_deref().map(clean_title).transpose()?;
        let body = self.body.as_deref().map(clean_body).transpose()?;
        Ok((title, body))
    }
}

fn clean_title(title: &str) -> Result<String, StoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StoreError::Invalid("title must not be empty".to_string()));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(StoreError::Invalid(format!(
            "title must be at most {TITLE_MAX_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

fn clean_body(body: &str) -> Result<String, StoreError> {
    if body.chars().count() > BODY_MAX_CHARS {
        return Err(StoreError::Invalid(format!(
            "body must be at most {BODY_MAX_CHARS} characters"
        )));
    }
    Ok(body.to_string())
}
