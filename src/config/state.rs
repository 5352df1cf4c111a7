// Application state module
// Shared state handed to every connection

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::sync::Notify;

use super::types::{Config, StorageKind};
use crate::handler::{self, Endpoint};
use crate::notes::{NoteStore, StoreError};
use crate::routing::Router;
use crate::session::SessionStore;

/// Application state
pub struct AppState {
    pub config: Config,
    pub router: Router<Endpoint>,
    pub notes: NoteStore,
    pub sessions: SessionStore,

    /// Connections currently being served
    pub active_connections: Arc<AtomicUsize>,
    /// Fired once when the process should stop accepting
    pub shutdown: Arc<Notify>,
}

impl AppState {
    /// Build state, opening the configured note storage
    pub async fn new(config: &Config) -> Result<Self, StoreError> {
        let notes = match config.notes.storage {
            StorageKind::Memory => NoteStore::in_memory(),
            StorageKind::File => NoteStore::open(&config.notes.file).await?,
        };

        Ok(Self::with_store(config, notes))
    }

    /// Build state around an already opened store
    pub fn with_store(config: &Config, notes: NoteStore) -> Self {
        Self {
            config: config.clone(),
            router: handler::build_router(),
            notes,
            sessions: SessionStore::new(
                chrono::Duration::try_seconds(config.cookies.session_max_age)
                    .unwrap_or(chrono::Duration::MAX),
            ),
            active_connections: Arc::new(AtomicUsize::new(0)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}
