//! Context sources backed by the local store and the calendar client.

use crate::calendar::CalendarClient;
use async_trait::async_trait;
use attache_core::{error::AttacheError, traits::ContextSource};
use attache_memory::Store;

const ARCHIVE_SEARCH_LIMIT: usize = 10;

/// Open tasks for the querying user.
pub struct TasksSource {
    store: Store,
    user_id: String,
}

impl TasksSource {
    pub fn new(store: Store, user_id: String) -> Self {
        Self { store, user_id }
    }
}

#[async_trait]
impl ContextSource for TasksSource {
    fn name(&self) -> &str {
        "tasks"
    }

    async fn fetch(&self, _query: &str, _target_date: Option<&str>) -> Result<String, AttacheError> {
        let tasks = self.store.pending_tasks(&self.user_id).await?;
        if tasks.is_empty() {
            return Ok("✅ No open tasks.".to_string());
        }

        let lines: Vec<String> = tasks
            .iter()
            .map(|t| {
                let due = t
                    .due_date
                    .as_deref()
                    .map(|d| format!(" (due {d})"))
                    .unwrap_or_default();
                format!("- {}{due}", t.title)
            })
            .collect();
        Ok(format!("✅ Open tasks:\n{}", lines.join("\n")))
    }
}

/// Saved notes matching the query.
pub struct ArchiveSource {
    store: Store,
    user_id: String,
}

impl ArchiveSource {
    pub fn new(store: Store, user_id: String) -> Self {
        Self { store, user_id }
    }
}

#[async_trait]
impl ContextSource for ArchiveSource {
    fn name(&self) -> &str {
        "archive"
    }

    async fn fetch(&self, query: &str, _target_date: Option<&str>) -> Result<String, AttacheError> {
        let mut notes = self
            .store
            .search_notes(&self.user_id, query, ARCHIVE_SEARCH_LIMIT)
            .await?;

        // Nothing matched the literal query: fall back to the newest notes.
        if notes.is_empty() {
            notes = self
                .store
                .recent_notes(&self.user_id, ARCHIVE_SEARCH_LIMIT)
                .await?;
        }

        if notes.is_empty() {
            return Ok("📝 No matching notes found in archive.".to_string());
        }

        let lines: Vec<String> = notes
            .iter()
            .map(|(content, created_at)| {
                format!("- {} ({created_at})", crate::chat::truncate(content, 150))
            })
            .collect();
        Ok(format!("📝 Saved notes:\n{}", lines.join("\n")))
    }
}

/// Calendar events for the target date.
pub struct CalendarSource {
    client: CalendarClient,
}

impl CalendarSource {
    pub fn new(client: CalendarClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContextSource for CalendarSource {
    fn name(&self) -> &str {
        "calendar"
    }

    async fn fetch(&self, _query: &str, target_date: Option<&str>) -> Result<String, AttacheError> {
        if !self.client.is_connected() {
            return Err(AttacheError::Service("calendar: not connected".to_string()));
        }

        let events = self.client.events_for_date(target_date).await?;
        let label = target_date.unwrap_or("today");
        if events.is_empty() {
            Ok(format!("📅 No events for {label}."))
        } else {
            Ok(format!("📅 Events for {label}:\n{}", events.join("\n")))
        }
    }
}
