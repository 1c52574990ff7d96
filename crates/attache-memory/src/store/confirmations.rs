//! Persisted rows for the confirmation state machine.
//!
//! Invariants enforced here:
//! - at most one 'awaiting' row per user (creating supersedes the old one)
//! - transitions out of 'awaiting' are conditional updates, so a
//!   double-confirm race resolves to exactly one winner
//! - expiry is lazy: checked on every read/claim, no background timer needed

use super::Store;
use attache_core::{error::AttacheError, intent::IntentDecision};
use uuid::Uuid;

/// A pending action awaiting user confirmation.
#[derive(Debug, Clone)]
pub struct PendingAction {
    pub id: String,
    pub user_id: String,
    pub decision: IntentDecision,
    pub summary: String,
    pub created_at: String,
    pub expires_at: String,
}

/// Result of trying to resolve the user's awaiting confirmation.
#[derive(Debug)]
pub enum ClaimOutcome {
    /// This caller won the claim; the action should proceed (or be
    /// acknowledged as cancelled).
    Claimed(PendingAction),
    /// The row's deadline had passed; it was marked expired instead.
    Expired(PendingAction),
    /// No awaiting row existed for this user.
    Nothing,
}

impl ClaimOutcome {
    /// The claimed action, when this caller won.
    pub fn claimed(self) -> Option<PendingAction> {
        match self {
            Self::Claimed(action) => Some(action),
            _ => None,
        }
    }
}

fn decode_row(
    user_id: &str,
    row: (String, String, String, String, String),
) -> Result<PendingAction, AttacheError> {
    let (id, intent_json, summary, created_at, expires_at) = row;
    let decision: IntentDecision = serde_json::from_str(&intent_json)?;
    Ok(PendingAction {
        id,
        user_id: user_id.to_string(),
        decision,
        summary,
        created_at,
        expires_at,
    })
}

impl Store {
    /// Stage an action for confirmation.
    ///
    /// Any existing awaiting row for this user is marked 'superseded'
    /// first; the newest request always wins.
    pub async fn create_pending(
        &self,
        user_id: &str,
        decision: &IntentDecision,
        ttl_secs: u64,
    ) -> Result<PendingAction, AttacheError> {
        // Supersede and insert commit together. Two racing creates on
        // separate pool connections would otherwise each supersede the
        // same old row and both insert, leaving two awaiting rows.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AttacheError::Storage(format!("begin create pending failed: {e}")))?;

        sqlx::query(
            "UPDATE pending_confirmations \
             SET state = 'superseded', resolved_at = datetime('now') \
             WHERE user_id = ? AND state = 'awaiting'",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AttacheError::Storage(format!("supersede failed: {e}")))?;

        let id = Uuid::new_v4().to_string();
        let intent_json = serde_json::to_string(decision)?;

        let row: (String, String, String, String, String) = sqlx::query_as(&format!(
            "INSERT INTO pending_confirmations (id, user_id, intent_json, summary, expires_at) \
             VALUES (?, ?, ?, ?, datetime('now', '+{ttl_secs} seconds')) \
             RETURNING id, intent_json, summary, created_at, expires_at"
        ))
        .bind(&id)
        .bind(user_id)
        .bind(&intent_json)
        .bind(&decision.summary)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AttacheError::Storage(format!("create pending failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AttacheError::Storage(format!("commit create pending failed: {e}")))?;

        decode_row(user_id, row)
    }

    /// The user's awaiting confirmation, if one exists and hasn't expired.
    pub async fn get_awaiting(&self, user_id: &str) -> Result<Option<PendingAction>, AttacheError> {
        self.expire_stale(user_id).await?;

        let row: Option<(String, String, String, String, String)> = sqlx::query_as(
            "SELECT id, intent_json, summary, created_at, expires_at \
             FROM pending_confirmations \
             WHERE user_id = ? AND state = 'awaiting'",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AttacheError::Storage(format!("get awaiting failed: {e}")))?;

        row.map(|r| decode_row(user_id, r)).transpose()
    }

    /// Atomically move the user's awaiting row to 'confirmed'.
    ///
    /// A deadline that already passed wins over the reply: the row goes
    /// to 'expired' and the caller learns the action was dropped.
    pub async fn confirm_pending(&self, user_id: &str) -> Result<ClaimOutcome, AttacheError> {
        self.claim(user_id, "confirmed").await
    }

    /// Atomically move the user's awaiting row to 'cancelled'.
    pub async fn cancel_pending(&self, user_id: &str) -> Result<ClaimOutcome, AttacheError> {
        self.claim(user_id, "cancelled").await
    }

    async fn claim(&self, user_id: &str, new_state: &str) -> Result<ClaimOutcome, AttacheError> {
        if let Some(expired) = self.expire_stale(user_id).await? {
            return Ok(ClaimOutcome::Expired(expired));
        }

        // The WHERE clause is the whole point: exactly one concurrent
        // claim can flip the row out of 'awaiting'. The deadline is
        // re-checked here too, in case the row expired between the
        // expire_stale pass above and this update.
        let row: Option<(String, String, String, String, String)> = sqlx::query_as(
            "UPDATE pending_confirmations \
             SET state = ?, resolved_at = datetime('now') \
             WHERE user_id = ? AND state = 'awaiting' \
             AND datetime(expires_at) > datetime('now') \
             RETURNING id, intent_json, summary, created_at, expires_at",
        )
        .bind(new_state)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AttacheError::Storage(format!("claim pending failed: {e}")))?;

        match row {
            Some(r) => Ok(ClaimOutcome::Claimed(decode_row(user_id, r)?)),
            None => Ok(ClaimOutcome::Nothing),
        }
    }

    /// Mark this user's awaiting row 'expired' if its deadline passed,
    /// returning the row that was expired.
    async fn expire_stale(&self, user_id: &str) -> Result<Option<PendingAction>, AttacheError> {
        let row: Option<(String, String, String, String, String)> = sqlx::query_as(
            "UPDATE pending_confirmations \
             SET state = 'expired', resolved_at = datetime('now') \
             WHERE user_id = ? AND state = 'awaiting' \
             AND datetime(expires_at) <= datetime('now') \
             RETURNING id, intent_json, summary, created_at, expires_at",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AttacheError::Storage(format!("expire stale failed: {e}")))?;

        row.map(|r| decode_row(user_id, r)).transpose()
    }

    /// The state of a confirmation row by id, for tests and diagnostics.
    pub async fn confirmation_state(&self, id: &str) -> Result<Option<String>, AttacheError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT state FROM pending_confirmations WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AttacheError::Storage(format!("state lookup failed: {e}")))?;
        Ok(row.map(|r| r.0))
    }
}
