//! In-process registry of live chat sessions.

use super::{ChatSession, SessionId};
use crate::agent::AgentFactory;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("Session not found: {0}")]
    NotFound(String),
}

/// Owns every open session. Sessions share the factory and nothing else.
pub struct SessionStore {
    factory: Arc<AgentFactory>,
    sessions: HashMap<SessionId, ChatSession>,
}

impl SessionStore {
    pub fn new(factory: Arc<AgentFactory>) -> Self {
        Self {
            factory,
            sessions: HashMap::new(),
        }
    }

    /// Open a new, uninitialized session.
    pub fn create(&mut self) -> SessionId {
        let session = ChatSession::new(self.factory.clone());
        let id = session.id().to_string();
        self.sessions.insert(id.clone(), session);
        id
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ChatSession> {
        self.sessions.get_mut(id)
    }

    /// Close a session, dropping its agent and transcript.
    pub fn destroy(&mut self, id: &str) -> Result<(), SessionStoreError> {
        self.sessions
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| SessionStoreError::NotFound(id.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
