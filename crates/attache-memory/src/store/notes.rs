//! Archive note storage and search.

use super::Store;
use attache_core::error::AttacheError;
use uuid::Uuid;

impl Store {
    /// Save a note. Tags are stored as a JSON array.
    pub async fn create_note(
        &self,
        user_id: &str,
        content: &str,
        tags: &[String],
    ) -> Result<String, AttacheError> {
        let id = Uuid::new_v4().to_string();
        let tags_json = serde_json::to_string(tags)?;

        sqlx::query("INSERT INTO notes (id, user_id, content, tags) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(user_id)
            .bind(content)
            .bind(&tags_json)
            .execute(&self.pool)
            .await
            .map_err(|e| AttacheError::Storage(format!("create note failed: {e}")))?;

        Ok(id)
    }

    /// Notes whose content or tags contain `query`, newest first.
    pub async fn search_notes(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<(String, String)>, AttacheError> {
        let pattern = format!("%{query}%");
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT content, created_at FROM notes \
             WHERE user_id = ? AND (content LIKE ? OR tags LIKE ?) \
             ORDER BY created_at DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AttacheError::Storage(format!("search notes failed: {e}")))?;

        Ok(rows)
    }

    /// The user's most recent notes.
    pub async fn recent_notes(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<(String, String)>, AttacheError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT content, created_at FROM notes \
             WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AttacheError::Storage(format!("recent notes failed: {e}")))?;

        Ok(rows)
    }
}
