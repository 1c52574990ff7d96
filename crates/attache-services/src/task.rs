//! Task domain service.

use async_trait::async_trait;
use attache_core::{
    error::AttacheError,
    intent::{IntentDecision, IntentPayload, TaskOp, TaskPayload},
    traits::DomainService,
};
use attache_memory::Store;
use tracing::info;

/// Executes task operations against the store and formats replies.
pub struct TaskService {
    store: Store,
}

impl TaskService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// The reply when no open task matched, listing what is open so the
    /// user can retry with a real title.
    async fn no_match_reply(&self, user_id: &str, query: &str) -> Result<String, AttacheError> {
        let open = self.store.pending_tasks(user_id).await?;
        if open.is_empty() {
            return Ok(format!(
                "I couldn't find \"{query}\". You have no open tasks."
            ));
        }
        let list: Vec<String> = open
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {}", i + 1, t.title))
            .collect();
        Ok(format!(
            "I couldn't find an open task matching \"{query}\".\n\nYour open tasks:\n{}",
            list.join("\n")
        ))
    }

    async fn run(&self, user_id: &str, payload: &TaskPayload) -> Result<String, AttacheError> {
        match payload.action {
            TaskOp::Create => {
                if payload.title.trim().is_empty() {
                    return Ok("I need a task description to add it.".to_string());
                }
                self.store
                    .create_task(
                        user_id,
                        &payload.title,
                        payload.due_date.as_deref(),
                        payload.priority,
                        payload.recurrence.as_deref(),
                        payload.category.as_deref(),
                    )
                    .await?;
                info!("[task] created '{}' for {user_id}", payload.title);
                let due = payload
                    .due_date
                    .as_deref()
                    .map(|d| format!(" (due {d})"))
                    .unwrap_or_default();
                Ok(format!("✅ Added task: {}{due}", payload.title))
            }
            TaskOp::Complete => {
                match self.store.complete_task(user_id, &payload.title).await? {
                    Some(title) => Ok(format!("✅ Completed: {title}")),
                    None => self.no_match_reply(user_id, &payload.title).await,
                }
            }
            TaskOp::CompleteAll => {
                let count = self.store.complete_all_tasks(user_id).await?;
                if count == 0 {
                    Ok("No open tasks to complete.".to_string())
                } else {
                    Ok(format!("✅ Completed all {count} open tasks."))
                }
            }
            TaskOp::Delete => match self.store.delete_task(user_id, &payload.title).await? {
                Some(title) => Ok(format!("🗑️ Deleted: {title}")),
                None => self.no_match_reply(user_id, &payload.title).await,
            },
            TaskOp::Edit => {
                let edited = self
                    .store
                    .edit_task(
                        user_id,
                        &payload.title,
                        payload.new_title.as_deref(),
                        payload.new_due_date.as_deref(),
                        payload.new_priority,
                    )
                    .await?;
                match edited {
                    Some(title) => Ok(format!("✏️ Updated: {title}")),
                    None => self.no_match_reply(user_id, &payload.title).await,
                }
            }
        }
    }
}

#[async_trait]
impl DomainService for TaskService {
    fn name(&self) -> &str {
        "task"
    }

    async fn execute(
        &self,
        user_id: &str,
        decision: &IntentDecision,
    ) -> Result<String, AttacheError> {
        match &decision.payload {
            IntentPayload::Task(payload) => self.run(user_id, payload).await,
            other => Err(AttacheError::Service(format!(
                "task service got non-task payload: {other:?}"
            ))),
        }
    }
}
