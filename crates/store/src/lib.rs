//! Conversation session store.
//!
//! Sessions are keyed by conversation id and live for the process
//! lifetime; there is no eviction. Each session is held behind its own
//! lock so turns for different conversations never serialize on each
//! other beyond the brief map access.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use procura_core::domain::session::{ConversationId, Session};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session backend failure: {0}")]
    Backend(String),
}

/// Shared handle to one conversation's state. Holding the lock gives a
/// turn exclusive access to that conversation only.
pub type SessionHandle = Arc<Mutex<Session>>;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the session handle for a conversation, creating an empty
    /// session on the first turn of a new conversation id.
    async fn checkout(&self, id: &ConversationId) -> Result<SessionHandle, StoreError>;

    /// Snapshot of an existing session, if any. Does not create one.
    async fn find(&self, id: &ConversationId) -> Result<Option<Session>, StoreError>;

    async fn len(&self) -> Result<usize, StoreError>;
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn checkout(&self, id: &ConversationId) -> Result<SessionHandle, StoreError> {
        {
            let sessions = self.sessions.read().await;
            if let Some(handle) = sessions.get(&id.0) {
                return Ok(Arc::clone(handle));
            }
        }

        let mut sessions = self.sessions.write().await;
        let handle = sessions
            .entry(id.0.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(id.clone()))));
        Ok(Arc::clone(handle))
    }

    async fn find(&self, id: &ConversationId) -> Result<Option<Session>, StoreError> {
        let handle = {
            let sessions = self.sessions.read().await;
            sessions.get(&id.0).cloned()
        };

        match handle {
            Some(handle) => Ok(Some(handle.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.sessions.read().await.len())
    }
}
