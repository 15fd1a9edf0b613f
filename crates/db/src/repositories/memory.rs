use std::collections::HashMap;

use tokio::sync::RwLock;

use bookline_core::session::{SessionError, SessionStore, TurnRecord};

#[derive(Clone, Debug, Default)]
struct UserSession {
    last_keyword: Option<String>,
    results: Vec<bookline_core::session::RenderedResult>,
    turns: Vec<TurnRecord>,
}

/// In-memory session store with the same replacement semantics as the
/// SQLite implementation. Used by tests and local smoke runs.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, UserSession>>,
}

impl InMemorySessionStore {
    /// Turn records captured for a user, in arrival order.
    pub async fn turns(&self, user_id: &str) -> Vec<TurnRecord> {
        let sessions = self.sessions.read().await;
        sessions.get(user_id).map(|session| session.turns.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn last_keyword(&self, user_id: &str) -> Result<Option<String>, SessionError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(user_id).and_then(|session| session.last_keyword.clone()))
    }

    async fn result_link(
        &self,
        user_id: &str,
        title: &str,
    ) -> Result<Option<String>, SessionError> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(None);
        }
        let sessions = self.sessions.read().await;
        let Some(session) = sessions.get(user_id) else {
            return Ok(None);
        };
        if let Some(exact) = session.results.iter().find(|result| result.title.trim() == title) {
            return Ok(Some(exact.detail_url.clone()));
        }
        Ok(session
            .results
            .iter()
            .find(|result| result.title.contains(title))
            .map(|result| result.detail_url.clone()))
    }

    async fn record_turn(&self, turn: TurnRecord) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(turn.user_id.clone()).or_default();
        if let Some(keyword) = &turn.resolved_keyword {
            session.last_keyword = Some(keyword.clone());
        }
        if !turn.results.is_empty() {
            session.results = turn.results.clone();
        }
        session.turns.push(turn);
        Ok(())
    }
}
