//! The intent model — the structured output of classification.
//!
//! The router turns free text into an [`IntentDecision`]: a closed set of
//! action payloads plus a confidence score and an ambiguity flag. Keeping
//! the payload a tagged enum (rather than a bag of optional fields) means
//! an unhandled action type is a compile error, not a silent fallthrough.

use serde::{Deserialize, Serialize};

/// The fixed set of action types the assistant can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Task,
    Calendar,
    Note,
    Query,
    Chat,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Calendar => "calendar",
            Self::Note => "note",
            Self::Query => "query",
            Self::Chat => "chat",
        }
    }

    /// Parse a classifier-emitted action type string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "task" => Some(Self::Task),
            "calendar" => Some(Self::Calendar),
            "note" => Some(Self::Note),
            "query" => Some(Self::Query),
            "chat" => Some(Self::Chat),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation on a task, as classified from the user's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOp {
    #[default]
    Create,
    Complete,
    CompleteAll,
    Delete,
    Edit,
}

/// Extracted fields for a task action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPayload {
    #[serde(default)]
    pub action: TaskOp,
    #[serde(default)]
    pub title: String,
    /// Absolute "YYYY-MM-DD HH:MM:SS" computed by the classifier.
    pub due_date: Option<String>,
    pub new_title: Option<String>,
    pub new_due_date: Option<String>,
    /// 0=low, 1=medium, 2=high, 3=urgent.
    #[serde(default)]
    pub priority: i64,
    pub new_priority: Option<i64>,
    pub recurrence: Option<String>,
    pub category: Option<String>,
}

/// Extracted fields for a calendar event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarPayload {
    pub summary: String,
    /// Absolute "YYYY-MM-DD HH:MM:SS".
    pub start_time: String,
    pub end_time: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// A note to save in the archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotePayload {
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// External data sources a query may need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    Calendar,
    Tasks,
    Archive,
    Email,
    Web,
    News,
    Market,
}

impl ContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::Tasks => "tasks",
            Self::Archive => "archive",
            Self::Email => "email",
            Self::Web => "web",
            Self::News => "news",
            Self::Market => "market",
        }
    }
}

/// A question or request for information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryPayload {
    pub query: String,
    #[serde(default)]
    pub context_needed: Vec<ContextKind>,
    /// "YYYY-MM-DD" when the user asked about a specific day.
    pub target_date: Option<String>,
}

/// Action-specific payload. One variant per [`ActionType`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IntentPayload {
    Task(TaskPayload),
    Calendar(CalendarPayload),
    Note(NotePayload),
    Query(QueryPayload),
    Chat,
}

/// A classified intent, produced once per message by the router and
/// consumed by the confirmation flow or the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentDecision {
    pub payload: IntentPayload,
    /// Classifier confidence, clamped to [0, 1].
    pub confidence: f64,
    /// One-line summary of the request, for confirmations and the log.
    pub summary: String,
    /// Set when the classification is too uncertain to act on directly.
    pub ambiguous: bool,
}

impl IntentDecision {
    /// The action type, derived from the payload variant.
    pub fn action(&self) -> ActionType {
        match self.payload {
            IntentPayload::Task(_) => ActionType::Task,
            IntentPayload::Calendar(_) => ActionType::Calendar,
            IntentPayload::Note(_) => ActionType::Note,
            IntentPayload::Query(_) => ActionType::Query,
            IntentPayload::Chat => ActionType::Chat,
        }
    }

    /// Whether this decision has an irreversible or broad effect.
    ///
    /// Delete and bulk-complete discard work; edit overwrites fields.
    /// All three are gated behind an explicit confirmation.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self.payload,
            IntentPayload::Task(TaskPayload {
                action: TaskOp::Delete | TaskOp::CompleteAll | TaskOp::Edit,
                ..
            })
        )
    }

    /// The degraded decision used when classification is impossible:
    /// fall through to a generic conversational reply.
    pub fn chat_fallback() -> Self {
        Self {
            payload: IntentPayload::Chat,
            confidence: 0.0,
            summary: "Fallback to chat (classification unavailable)".into(),
            ambiguous: false,
        }
    }
}
