//! The interaction log.
//!
//! Every handled message lands here with its reply and classification.
//! The most recent rows become the classifier's context window.

use super::Store;
use attache_core::error::AttacheError;

/// One logged exchange.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub user_text: String,
    pub reply_text: String,
    pub action: String,
}

impl Store {
    /// Append one exchange to the log.
    #[allow(clippy::too_many_arguments)]
    pub async fn log_interaction(
        &self,
        user_id: &str,
        channel: &str,
        user_text: &str,
        reply_text: &str,
        action: &str,
        confidence: f64,
        tier_used: Option<&str>,
    ) -> Result<(), AttacheError> {
        sqlx::query(
            "INSERT INTO interaction_log \
             (user_id, channel, user_text, reply_text, action, confidence, tier_used) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(channel)
        .bind(user_text)
        .bind(reply_text)
        .bind(action)
        .bind(confidence)
        .bind(tier_used)
        .execute(&self.pool)
        .await
        .map_err(|e| AttacheError::Storage(format!("log interaction failed: {e}")))?;
        Ok(())
    }

    /// The user's most recent exchanges, oldest first, capped at `limit`.
    pub async fn recent_context(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Interaction>, AttacheError> {
        let limit = limit.min(self.max_context_messages);
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT user_text, reply_text, action FROM interaction_log \
             WHERE user_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AttacheError::Storage(format!("recent context failed: {e}")))?;

        Ok(rows
            .into_iter()
            .rev()
            .map(|(user_text, reply_text, action)| Interaction {
                user_text,
                reply_text,
                action,
            })
            .collect())
    }
}
