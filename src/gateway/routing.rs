//! The intent router: free text in, one [`IntentDecision`] out.
//!
//! Classification runs through the tiered gateway in JSON mode. The
//! router is infallible by contract: any gateway failure or malformed
//! classifier output degrades to the chat fallback (confidence 0.0)
//! instead of surfacing an error, so the user always gets some reply.

use attache_core::config::RouterConfig;
use attache_core::intent::{
    ActionType, CalendarPayload, IntentDecision, IntentPayload, NotePayload, QueryPayload,
    TaskPayload,
};
use attache_llm::{LlmGateway, LlmRequest};
use attache_memory::store::Interaction;
use chrono::Local;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

const ROUTER_CONTEXT_LINES: usize = 5;

const CLASSIFIER_INSTRUCTIONS: &str = r#"You are the intent classifier for a personal chief-of-staff assistant. Classify the user's message into exactly one action type:

- "task": create, complete, complete all, delete, or edit a to-do item
- "calendar": schedule an event at a specific time
- "note": save information for later (passwords, ideas, references)
- "query": a question needing data (schedule, tasks, saved notes, email, web, news, markets)
- "chat": greetings, opinions, anything conversational

Respond with a single JSON object:
{
  "classification": {
    "action_type": "task|calendar|note|query|chat",
    "confidence": 0.0-1.0,
    "runner_up_confidence": 0.0-1.0 or null,
    "summary": "one line describing what the user wants"
  },
  "task": { "action": "create|complete|complete_all|delete|edit", "title": "...", "due_date": "YYYY-MM-DD HH:MM:SS or null", "new_title": null, "new_due_date": null, "priority": 0, "new_priority": null, "recurrence": null, "category": null },
  "calendar": { "summary": "...", "start_time": "YYYY-MM-DD HH:MM:SS", "end_time": null, "location": null, "description": null },
  "note": { "content": "...", "tags": [] },
  "query": { "query": "...", "context_needed": ["calendar"|"tasks"|"archive"|"email"|"web"|"news"|"market"], "target_date": "YYYY-MM-DD or null" }
}

Include ONLY the payload object matching the chosen action_type (none for "chat").
Resolve all relative dates ("tomorrow", "Sunday at 10") to absolute values using the current time below.
"runner_up_confidence" is the confidence of the second-best action type, or null when no other type is plausible.
The user writes in Hebrew or English; the summary should be in the user's language."#;

#[derive(Debug, Deserialize)]
struct RouterResponse {
    classification: Classification,
    task: Option<TaskPayload>,
    calendar: Option<CalendarPayload>,
    note: Option<NotePayload>,
    query: Option<QueryPayload>,
}

#[derive(Debug, Deserialize)]
struct Classification {
    #[serde(default)]
    action_type: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    runner_up_confidence: Option<f64>,
    #[serde(default)]
    summary: String,
}

/// Classifies messages into intent decisions.
pub struct IntentRouter {
    gateway: Arc<LlmGateway>,
    config: RouterConfig,
}

impl IntentRouter {
    pub fn new(gateway: Arc<LlmGateway>, config: RouterConfig) -> Self {
        Self { gateway, config }
    }

    /// Classify one message, with recent exchanges for disambiguation.
    pub async fn classify(&self, text: &str, recent: &[Interaction]) -> IntentDecision {
        let request = LlmRequest::single(self.system_prompt(recent), text).json_mode();

        let raw = match self.gateway.complete(&request).await {
            Ok(resp) => resp.text,
            Err(e) => {
                warn!("[router] gateway unavailable, falling back to chat: {e}");
                return IntentDecision::chat_fallback();
            }
        };

        match self.decode(&raw) {
            Some(decision) => {
                debug!(
                    "[router] {} (confidence {:.2}, ambiguous: {})",
                    decision.action(),
                    decision.confidence,
                    decision.ambiguous
                );
                decision
            }
            None => {
                warn!("[router] unparseable classifier output, falling back to chat");
                IntentDecision::chat_fallback()
            }
        }
    }

    fn system_prompt(&self, recent: &[Interaction]) -> String {
        let now = Local::now();
        let mut prompt = format!(
            "{CLASSIFIER_INSTRUCTIONS}\n\nCurrent time: {} ({})",
            now.format("%Y-%m-%d %H:%M:%S"),
            now.format("%A"),
        );

        if !recent.is_empty() {
            let lines: Vec<String> = recent
                .iter()
                .rev()
                .take(ROUTER_CONTEXT_LINES)
                .rev()
                .map(|ix| format!("User: {} -> [{}]", ix.user_text, ix.action))
                .collect();
            prompt.push_str(&format!(
                "\n\nRecent exchanges (for disambiguation):\n{}",
                lines.join("\n")
            ));
        }

        prompt
    }

    /// Decode classifier JSON into a decision. `None` means fall back.
    fn decode(&self, raw: &str) -> Option<IntentDecision> {
        let response: RouterResponse = serde_json::from_str(strip_fences(raw)).ok()?;
        let action = ActionType::parse(&response.classification.action_type)?;

        let payload = match action {
            ActionType::Task => IntentPayload::Task(response.task?),
            ActionType::Calendar => IntentPayload::Calendar(response.calendar?),
            ActionType::Note => IntentPayload::Note(response.note?),
            ActionType::Query => IntentPayload::Query(response.query?),
            ActionType::Chat => IntentPayload::Chat,
        };

        let confidence = response.classification.confidence.clamp(0.0, 1.0);

        let below_threshold =
            action != ActionType::Chat && confidence < self.config.confidence_threshold;
        let close_runner_up = response
            .classification
            .runner_up_confidence
            .map(|r| confidence - r.clamp(0.0, 1.0) < self.config.ambiguity_margin)
            .unwrap_or(false);

        Some(IntentDecision {
            payload,
            confidence,
            summary: response.classification.summary,
            ambiguous: below_threshold || close_runner_up,
        })
    }
}

/// Strip markdown code fences some models wrap JSON in.
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use attache_llm::{BackendError, LlmBackend, LlmResponse, Tier};
    use std::time::Duration;

    struct ScriptedBackend {
        reply: Result<String, ()>,
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }
        async fn complete(
            &self,
            model: &str,
            _request: &LlmRequest,
        ) -> Result<LlmResponse, BackendError> {
            match &self.reply {
                Ok(text) => Ok(LlmResponse {
                    text: text.clone(),
                    model: model.to_string(),
                    tier: String::new(),
                    tokens_used: None,
                    elapsed_ms: 1,
                }),
                Err(()) => Err(BackendError::Fatal("down".into())),
            }
        }
    }

    fn router(reply: Result<String, ()>) -> IntentRouter {
        let gateway = Arc::new(LlmGateway::new(vec![Tier {
            backend: Arc::new(ScriptedBackend { reply }),
            model: "m".into(),
            retries: 0,
            timeout: Duration::from_secs(5),
        }]));
        IntentRouter::new(gateway, RouterConfig::default())
    }

    #[tokio::test]
    async fn test_task_classification() {
        let json = r#"{
            "classification": {"action_type": "task", "confidence": 0.92,
                "runner_up_confidence": null, "summary": "Add a task to buy milk"},
            "task": {"action": "create", "title": "buy milk", "due_date": null,
                "new_title": null, "new_due_date": null, "priority": 1,
                "new_priority": null, "recurrence": null, "category": null}
        }"#;
        let decision = router(Ok(json.into())).classify("buy milk", &[]).await;
        assert_eq!(decision.action(), ActionType::Task);
        assert_eq!(decision.confidence, 0.92);
        assert!(!decision.ambiguous);
    }

    #[tokio::test]
    async fn test_confidence_clamped_to_unit_interval() {
        let json = r#"{
            "classification": {"action_type": "chat", "confidence": 1.7,
                "runner_up_confidence": null, "summary": "hi"}
        }"#;
        let decision = router(Ok(json.into())).classify("hey", &[]).await;
        assert_eq!(decision.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_low_confidence_flags_ambiguous() {
        let json = r#"{
            "classification": {"action_type": "note", "confidence": 0.4,
                "runner_up_confidence": null, "summary": "maybe save this"},
            "note": {"content": "something", "tags": []}
        }"#;
        let decision = router(Ok(json.into())).classify("hmm", &[]).await;
        assert_eq!(decision.action(), ActionType::Note);
        assert!(decision.ambiguous);
    }

    #[tokio::test]
    async fn test_close_runner_up_flags_ambiguous() {
        let json = r#"{
            "classification": {"action_type": "task", "confidence": 0.6,
                "runner_up_confidence": 0.55, "summary": "task or note?"},
            "task": {"action": "create", "title": "remember the milk"}
        }"#;
        let decision = router(Ok(json.into())).classify("remember milk", &[]).await;
        assert!(decision.ambiguous);
    }

    #[tokio::test]
    async fn test_gateway_failure_falls_back_to_chat() {
        let decision = router(Err(())).classify("buy milk", &[]).await;
        assert_eq!(decision.action(), ActionType::Chat);
        assert_eq!(decision.confidence, 0.0);
        assert!(!decision.ambiguous);
    }

    #[tokio::test]
    async fn test_garbage_output_falls_back_to_chat() {
        let decision = router(Ok("not json at all".into()))
            .classify("buy milk", &[])
            .await;
        assert_eq!(decision.action(), ActionType::Chat);
        assert_eq!(decision.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_unknown_action_type_falls_back() {
        let json = r#"{
            "classification": {"action_type": "teleport", "confidence": 0.9,
                "runner_up_confidence": null, "summary": "??"}
        }"#;
        let decision = router(Ok(json.into())).classify("beam me up", &[]).await;
        assert_eq!(decision.action(), ActionType::Chat);
    }

    #[tokio::test]
    async fn test_missing_payload_falls_back() {
        // Classifier says "calendar" but sends no calendar object.
        let json = r#"{
            "classification": {"action_type": "calendar", "confidence": 0.9,
                "runner_up_confidence": null, "summary": "schedule something"}
        }"#;
        let decision = router(Ok(json.into())).classify("meeting sunday", &[]).await;
        assert_eq!(decision.action(), ActionType::Chat);
    }

    #[tokio::test]
    async fn test_fenced_json_accepted() {
        let json = "```json\n{\"classification\": {\"action_type\": \"chat\", \"confidence\": 0.8, \"runner_up_confidence\": null, \"summary\": \"hi\"}}\n```";
        let decision = router(Ok(json.into())).classify("hey", &[]).await;
        assert_eq!(decision.action(), ActionType::Chat);
        assert_eq!(decision.confidence, 0.8);
    }
}
