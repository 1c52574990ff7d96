//! Task CRUD with fuzzy title dedup.

use super::Store;
use attache_core::error::AttacheError;
use uuid::Uuid;

/// One task row, as shown to the user.
#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub due_date: Option<String>,
    pub priority: i64,
    pub recurrence: Option<String>,
    pub category: Option<String>,
}

impl Store {
    /// Create a task unconditionally.
    ///
    /// Duplicate detection is the caller's concern: check
    /// [`Store::find_similar_task`] first and ask the user before
    /// inserting a near-duplicate.
    pub async fn create_task(
        &self,
        user_id: &str,
        title: &str,
        due_date: Option<&str>,
        priority: i64,
        recurrence: Option<&str>,
        category: Option<&str>,
    ) -> Result<String, AttacheError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO tasks (id, user_id, title, due_date, priority, recurrence, category) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(title)
        .bind(due_date)
        .bind(priority)
        .bind(recurrence)
        .bind(category)
        .execute(&self.pool)
        .await
        .map_err(|e| AttacheError::Storage(format!("create task failed: {e}")))?;

        Ok(id)
    }

    /// The title of an existing pending task similar to `title`, if any.
    pub async fn find_similar_task(
        &self,
        user_id: &str,
        title: &str,
    ) -> Result<Option<String>, AttacheError> {
        let pending: Vec<(String,)> = sqlx::query_as(
            "SELECT title FROM tasks WHERE user_id = ? AND status = 'pending'",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AttacheError::Storage(format!("task similarity check failed: {e}")))?;

        Ok(pending
            .into_iter()
            .map(|(t,)| t)
            .find(|existing| titles_are_similar(title, existing)))
    }

    /// Complete the pending task best matching `title_query`.
    ///
    /// Returns the completed task's title, or `None` when nothing matched.
    pub async fn complete_task(
        &self,
        user_id: &str,
        title_query: &str,
    ) -> Result<Option<String>, AttacheError> {
        let Some((id, title)) = self.find_pending(user_id, title_query).await? else {
            return Ok(None);
        };

        sqlx::query(
            "UPDATE tasks SET status = 'completed', completed_at = datetime('now') WHERE id = ?",
        )
        .bind(&id)
        .execute(&self.pool)
        .await
        .map_err(|e| AttacheError::Storage(format!("complete task failed: {e}")))?;

        Ok(Some(title))
    }

    /// Complete every pending task. Returns how many were completed.
    pub async fn complete_all_tasks(&self, user_id: &str) -> Result<u64, AttacheError> {
        let result = sqlx::query(
            "UPDATE tasks SET status = 'completed', completed_at = datetime('now') \
             WHERE user_id = ? AND status = 'pending'",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AttacheError::Storage(format!("complete all failed: {e}")))?;

        Ok(result.rows_affected())
    }

    /// Delete the pending task best matching `title_query`.
    ///
    /// Soft delete: the row flips to 'deleted' and stays for audit.
    pub async fn delete_task(
        &self,
        user_id: &str,
        title_query: &str,
    ) -> Result<Option<String>, AttacheError> {
        let Some((id, title)) = self.find_pending(user_id, title_query).await? else {
            return Ok(None);
        };

        sqlx::query("UPDATE tasks SET status = 'deleted' WHERE id = ?")
            .bind(&id)
            .execute(&self.pool)
            .await
            .map_err(|e| AttacheError::Storage(format!("delete task failed: {e}")))?;

        Ok(Some(title))
    }

    /// Update fields of the pending task best matching `title_query`.
    ///
    /// Only non-`None` fields are written. Returns the edited task's
    /// original title, or `None` when nothing matched.
    pub async fn edit_task(
        &self,
        user_id: &str,
        title_query: &str,
        new_title: Option<&str>,
        new_due_date: Option<&str>,
        new_priority: Option<i64>,
    ) -> Result<Option<String>, AttacheError> {
        let Some((id, title)) = self.find_pending(user_id, title_query).await? else {
            return Ok(None);
        };

        let mut sets = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(t) = new_title {
            sets.push("title = ?");
            values.push(t.to_string());
        }
        if let Some(d) = new_due_date {
            sets.push("due_date = ?");
            values.push(d.to_string());
        }
        if let Some(p) = new_priority {
            sets.push("priority = ?");
            values.push(p.to_string());
        }

        if sets.is_empty() {
            return Ok(Some(title));
        }

        let sql = format!("UPDATE tasks SET {} WHERE id = ?", sets.join(", "));
        let mut query = sqlx::query(&sql);
        for v in &values {
            query = query.bind(v);
        }
        query = query.bind(&id);

        query
            .execute(&self.pool)
            .await
            .map_err(|e| AttacheError::Storage(format!("edit task failed: {e}")))?;

        Ok(Some(title))
    }

    /// All pending tasks for a user, soonest due first (undated last).
    pub async fn pending_tasks(&self, user_id: &str) -> Result<Vec<TaskRow>, AttacheError> {
        let rows: Vec<(
            String,
            String,
            Option<String>,
            i64,
            Option<String>,
            Option<String>,
        )> = sqlx::query_as(
            "SELECT id, title, due_date, priority, recurrence, category \
             FROM tasks WHERE user_id = ? AND status = 'pending' \
             ORDER BY due_date IS NULL, due_date ASC, priority DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AttacheError::Storage(format!("pending tasks failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(id, title, due_date, priority, recurrence, category)| TaskRow {
                id,
                title,
                due_date,
                priority,
                recurrence,
                category,
            })
            .collect())
    }

    /// Find a pending task by exact substring match, then by word overlap.
    async fn find_pending(
        &self,
        user_id: &str,
        title_query: &str,
    ) -> Result<Option<(String, String)>, AttacheError> {
        let exact: Option<(String, String)> = sqlx::query_as(
            "SELECT id, title FROM tasks \
             WHERE user_id = ? AND status = 'pending' AND title LIKE ? \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .bind(format!("%{title_query}%"))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AttacheError::Storage(format!("task lookup failed: {e}")))?;

        if exact.is_some() {
            return Ok(exact);
        }

        let pending: Vec<(String, String)> = sqlx::query_as(
            "SELECT id, title FROM tasks WHERE user_id = ? AND status = 'pending'",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AttacheError::Storage(format!("task lookup failed: {e}")))?;

        Ok(pending
            .into_iter()
            .find(|(_, title)| titles_are_similar(title_query, title)))
    }
}

/// Check if two task titles are semantically similar via word overlap.
///
/// Extracts significant words (2+ chars, excluding stop words), returns true
/// if 50%+ of the smaller word set overlaps with the larger. Requires at
/// least 2 significant words in each title to avoid false positives.
pub(super) fn titles_are_similar(a: &str, b: &str) -> bool {
    let words_a = significant_words(a);
    let words_b = significant_words(b);

    if words_a.len() < 2 || words_b.len() < 2 {
        return false;
    }

    let (smaller, larger) = if words_a.len() <= words_b.len() {
        (&words_a, &words_b)
    } else {
        (&words_b, &words_a)
    };

    let overlap = smaller.iter().filter(|w| larger.contains(w)).count();
    let threshold = smaller.len().div_ceil(2);
    overlap >= threshold
}

/// Extract significant words from text (lowercase, 2+ chars, no stop words).
fn significant_words(text: &str) -> Vec<String> {
    const STOP_WORDS: &[&str] = &[
        "the", "and", "for", "that", "this", "with", "from", "are", "was", "will", "about", "into",
        "then", "task", "todo", "את", "של", "עם", "לא",
    ];
    text.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.chars().count() >= 2 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

#[cfg(test)]
mod similarity_tests {
    use super::titles_are_similar;

    #[test]
    fn test_similar_titles() {
        assert!(titles_are_similar("buy milk tomorrow", "buy milk"));
        assert!(titles_are_similar("call the dentist office", "call dentist"));
    }

    #[test]
    fn test_different_titles() {
        assert!(!titles_are_similar("buy milk", "walk the dog tonight"));
    }

    #[test]
    fn test_short_titles_never_match() {
        assert!(!titles_are_similar("milk", "milk"));
    }
}
