//! Cookie session module
//!
//! Server-side session table keyed by a random id the client carries in a cookie.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A logged-in session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// In-memory session table
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session for `username`; `None` if the expiry is out of range
    pub async fn create(&self, username: &str) -> Option<Session> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().simple().to_string(),
            username: username.to_string(),
            expires_at: now.checked_add_signed(self.ttl)?,
        };
        let mut sessions = self.sessions.write().await;
        // Sweep expired entries on every login
        sessions.retain(|_, s| !s.is_expired(now));
        sessions.insert(session.id.clone(), session.clone());
        Some(session)
    }

    /// Live session for `id`; expired entries are dropped on sight
    pub async fn get(&self, id: &str) -> Option<Session> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                None => return None,
                Some(s) if !s.is_expired(now) => return Some(s.clone()),
                Some(_) => {}
            }
        }
        self.sessions.write().await.remove(id);
        None
    }

    /// Remove a session; returns whether one existed
    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
