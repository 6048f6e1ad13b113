use async_trait::async_trait;
use dashmap::DashMap;
use relay_core::{DirectoryError, Session, SessionDirectory, SessionId};

/// Process-local session directory.
#[derive(Default)]
pub struct MemorySessionDirectory {
    sessions: DashMap<SessionId, Session>,
}

impl MemorySessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// All sessions, newest first.
    pub fn list(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.sessions.iter().map(|e| e.value().clone()).collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.as_str().cmp(a.id.as_str())));
        sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionDirectory for MemorySessionDirectory {
    async fn create(&self, title: &str) -> Result<Session, DirectoryError> {
        let session = Session::new(title);
        self.sessions.insert(session.id.clone(), session.clone());
        tracing::debug!(session_id = %session.id, title, "session created");
        Ok(session)
    }

    async fn get(&self, id: &SessionId) -> Result<Session, DirectoryError> {
        self.sessions
            .get(id)
            .map(|s| s.value().clone())
            .ok_or_else(|| DirectoryError::NotFound(id.clone()))
    }

    async fn delete(&self, id: &SessionId) -> Result<(), DirectoryError> {
        self.sessions
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DirectoryError::NotFound(id.clone()))
    }
}
