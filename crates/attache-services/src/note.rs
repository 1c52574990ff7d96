//! Note (archive) domain service.

use async_trait::async_trait;
use attache_core::{
    error::AttacheError,
    intent::{IntentDecision, IntentPayload},
    traits::DomainService,
};
use attache_memory::Store;
use tracing::info;

/// Saves notes to the archive.
pub struct NoteService {
    store: Store,
}

impl NoteService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DomainService for NoteService {
    fn name(&self) -> &str {
        "note"
    }

    async fn execute(
        &self,
        user_id: &str,
        decision: &IntentDecision,
    ) -> Result<String, AttacheError> {
        let payload = match &decision.payload {
            IntentPayload::Note(p) => p,
            other => {
                return Err(AttacheError::Service(format!(
                    "note service got non-note payload: {other:?}"
                )))
            }
        };

        if payload.content.trim().is_empty() {
            return Ok("There's nothing to save.".to_string());
        }

        self.store
            .create_note(user_id, &payload.content, &payload.tags)
            .await?;
        info!("[note] saved {} chars for {user_id}", payload.content.len());

        if payload.tags.is_empty() {
            Ok("📝 Saved to your archive.".to_string())
        } else {
            Ok(format!(
                "📝 Saved to your archive (tags: {}).",
                payload.tags.join(", ")
            ))
        }
    }
}
