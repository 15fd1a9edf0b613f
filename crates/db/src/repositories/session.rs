use chrono::Utc;

use bookline_core::session::{RenderedResult, SessionError, SessionStore, TurnRecord};

use crate::DbPool;

/// SQLite-backed session store. Keyword state is last-write-wins per user;
/// the rendered result set is replaced wholesale inside the same
/// transaction as the turn log, so synopsis lookups never see a torn set.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: DbPool,
}

impl SqliteSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn persistence_error(error: sqlx::Error) -> SessionError {
    SessionError(error.to_string())
}

#[async_trait::async_trait]
impl SessionStore for SqliteSessionStore {
    async fn last_keyword(&self, user_id: &str) -> Result<Option<String>, SessionError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT last_keyword FROM session_keywords WHERE user_id = ?1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(persistence_error)?;
        Ok(row.map(|(keyword,)| keyword))
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

        let exact: Option<(String,)> = sqlx::query_as(
            "SELECT detail_url FROM session_results \
             WHERE user_id = ?1 AND title = ?2 ORDER BY position LIMIT 1",
        )
        .bind(user_id)
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence_error)?;
        if let Some((detail_url,)) = exact {
            return Ok(Some(detail_url));
        }

        let partial: Option<(String,)> = sqlx::query_as(
            "SELECT detail_url FROM session_results \
             WHERE user_id = ?1 AND instr(title, ?2) > 0 ORDER BY position LIMIT 1",
        )
        .bind(user_id)
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence_error)?;
        Ok(partial.map(|(detail_url,)| detail_url))
    }

    async fn record_turn(&self, turn: TurnRecord) -> Result<(), SessionError> {
        let mut tx = self.pool.begin().await.map_err(persistence_error)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO session_turns \
             (user_id, utterance, response_summary, resolved_keyword, result_count, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&turn.user_id)
        .bind(&turn.utterance)
        .bind(&turn.response_summary)
        .bind(&turn.resolved_keyword)
        .bind(turn.results.len() as i64)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(persistence_error)?;

        if let Some(keyword) = &turn.resolved_keyword {
            sqlx::query(
                "INSERT INTO session_keywords (user_id, last_keyword, updated_at) \
                 VALUES (?1, ?2, ?3) \
                 ON CONFLICT(user_id) DO UPDATE SET \
                 last_keyword = excluded.last_keyword, updated_at = excluded.updated_at",
            )
            .bind(&turn.user_id)
            .bind(keyword)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(persistence_error)?;
        }

        if !turn.results.is_empty() {
            sqlx::query("DELETE FROM session_results WHERE user_id = ?1")
                .bind(&turn.user_id)
                .execute(&mut *tx)
                .await
                .map_err(persistence_error)?;

            for (position, RenderedResult { title, detail_url }) in turn.results.iter().enumerate()
            {
                sqlx::query(
                    "INSERT INTO session_results (user_id, position, title, detail_url) \
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .bind(&turn.user_id)
                .bind(position as i64)
                .bind(title)
                .bind(detail_url)
                .execute(&mut *tx)
                .await
                .map_err(persistence_error)?;
            }
        }

        tx.commit().await.map_err(persistence_error)
    }
}
