//! Guest session storage
//!
//! Injectable store keyed by session id. The in-memory store is the default;
//! a durable store must keep the same keying.

use super::types::GuestSession;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait GuestSessionStore: Send + Sync {
    async fn insert(&self, session: GuestSession);

    async fn get(&self, session_id: &str) -> Option<GuestSession>;

    /// Returns whether a session was removed.
    async fn remove(&self, session_id: &str) -> bool;

    async fn len(&self) -> usize;
}

#[derive(Debug, Default, Clone)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, GuestSession>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GuestSessionStore for MemorySessionStore {
    async fn insert(&self, session: GuestSession) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.session_id.clone(), session);
    }

    async fn get(&self, session_id: &str) -> Option<GuestSession> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).cloned()
    }

    async fn remove(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id).is_some()
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
