//! The processed-message ledger.
//!
//! One conditional insert decides whether a delivery is handled. Losing
//! the race means some other worker (or a previous run) already owns the
//! message, and the caller must drop it silently.

use super::Store;
use attache_core::error::AttacheError;

impl Store {
    /// Record `(channel, message_id)` as processed.
    ///
    /// Returns `true` if this call inserted the row (the caller owns the
    /// message), `false` if it was already present (duplicate delivery).
    pub async fn mark_processed(
        &self,
        channel: &str,
        message_id: &str,
    ) -> Result<bool, AttacheError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO processed_messages (channel, message_id) VALUES (?, ?)",
        )
        .bind(channel)
        .bind(message_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AttacheError::Storage(format!("dedup insert failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete ledger entries older than `retention_days`.
    ///
    /// Channels stop redelivering long before this window closes, so old
    /// rows are pure bloat. Returns the number of rows pruned.
    pub async fn prune_processed(&self, retention_days: u32) -> Result<u64, AttacheError> {
        let result = sqlx::query(&format!(
            "DELETE FROM processed_messages \
             WHERE datetime(processed_at) < datetime('now', '-{retention_days} days')"
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| AttacheError::Storage(format!("dedup prune failed: {e}")))?;

        Ok(result.rows_affected())
    }
}
