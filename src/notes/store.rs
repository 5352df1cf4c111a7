// Note storage module
// In-memory map, optionally mirrored to a flat JSON file after every mutation

use chrono::Utc;
use hyper::StatusCode;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;

use super::model::{Note, NoteInput};
use crate::logger;

/// Errors raised by the note store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("note {0} not found")]
    NotFound(u64),
    #[error("{0}")]
    Invalid(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("notes file {path} is not a JSON array of notes: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize notes: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("note ids are exhausted")]
    IdsExhausted,
}

impl StoreError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::Io { .. } | Self::Corrupt { .. } | Self::Serialize(_) | Self::IdsExhausted => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug)]
struct Notes {
    items: BTreeMap<u64, Note>,
    /// `None` once `u64::MAX` has been handed out
    next_id: Option<u64>,
}

impl Notes {
    fn from_vec(list: Vec<Note>) -> Self {
        let next_id = list.iter().map(|n| n.id).max().unwrap_or(0).checked_add(1);
        Self {
            items: list.into_iter().map(|n| (n.id, n)).collect(),
            next_id,
        }
    }
}

/// Note store shared by all connections
#[derive(Debug)]
pub struct NoteStore {
    inner: RwLock<Notes>,
    /// Backing file; `None` keeps notes in memory only
    file: Option<PathBuf>,
}

impl NoteStore {
    pub fn in_memory() -> Self {
        Self {
            inner: RwLock::new(Notes::from_vec(Vec::new())),
            file: None,
        }
    }

    /// Open a file-backed store; a missing file starts empty
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let notes = match fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Notes::from_vec(Vec::new()),
            Ok(bytes) => {
                let list: Vec<Note> =
                    serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                        path: path.clone(),
                        source,
                    })?;
                logger::log_info(&format!(
                    "[Notes] Loaded {} notes from {}",
                    list.len(),
                    path.display()
                ));
                Notes::from_vec(list)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                logger::log_info(&format!(
                    "[Notes] {} does not exist yet, starting empty",
                    path.display()
                ));
                Notes::from_vec(Vec::new())
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        Ok(Self {
            inner: RwLock::new(notes),
            file: Some(path),
        })
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// All notes in ascending id order, optionally filtered
    pub async fn list(&self, query: Option<&str>) -> Vec<Note> {
        let notes = self.inner.read().await;
        notes
            .items
            .values()
            .filter(|n| query.map_or(true, |q| n.matches(q)))
            .cloned()
            .collect()
    }

    pub async fn get(&self, id: u64) -> Result<Note, StoreError> {
        self.inner
            .read()
            .await
            .items
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    pub async fn create(&self, input: &NoteInput) -> Result<Note, StoreError> {
        let (title, body) = input.for_create()?;
        let mut notes = self.inner.write().await;
        let id = notes.next_id.ok_or(StoreError::IdsExhausted)?;

        let now = Utc::now();
        let note = Note {
            id,
            title,
            body,
            created_at: now,
            updated_at: now,
        };
        notes.items.insert(note.id, note.clone());

        if let Err(e) = self.persist(&notes).await {
            notes.items.remove(&note.id);
            return Err(e);
        }
        notes.next_id = id.checked_add(1);
        Ok(note)
    }

    /// Apply a partial update and bump `updated_at`
    pub async fn update(&self, id: u64, input: &NoteInput) -> Result<Note, StoreError> {
        let (title, body) = input.for_update()?;
        let mut notes = self.inner.write().await;

        let previous = notes.items.get(&id).cloned().ok_or(StoreError::NotFound(id))?;
        let mut note = previous.clone();
        if let Some(title) = title {
            note.title = title;
        }
        if let Some(body) = body {
            note.body = body;
        }
        note.updated_at = Utc::now();
        notes.items.insert(id, note.clone());

        if let Err(e) = self.persist(&notes).await {
            notes.items.insert(id, previous);
            return Err(e);
        }
        Ok(note)
    }

    pub async fn delete(&self, id: u64) -> Result<Note, StoreError> {
        let mut notes = self.inner.write().await;
        let removed = notes.items.remove(&id).ok_or(StoreError::NotFound(id))?;

        if let Err(e) = self.persist(&notes).await {
            notes.items.insert(id, removed);
            return Err(e);
        }
        Ok(removed)
    }

    /// Write the current contents to disk (no-op for memory storage)
    pub async fn flush(&self) -> Result<(), StoreError> {
        let notes = self.inner.read().await;
        self.persist(&notes).await
    }

    /// Rewrite the whole file: temp file in the same directory, then rename
    async fn persist(&self, notes: &Notes) -> Result<(), StoreError> {
        let Some(path) = &self.file else {
            return Ok(());
        };

        let list: Vec<&Note> = notes.items.values().collect();
        let json = serde_json::to_vec_pretty(&list)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::io(parent, e))?;
            }
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::io(path, e));
        }

        logger::log_debug(&format!(
            "[Notes] Saved {} notes to {}",
            list.len(),
            path.display()
        ));
        Ok(())
    }
}
