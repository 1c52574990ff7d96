//! Conversational chat service.
//!
//! The catch-all action: anything that isn't a task, event, note, or
//! query lands here. Replies use the identity prompt plus the user's
//! recent conversation for continuity. Unlike the other services this
//! one takes the raw message text, not a payload.

use crate::prompts::{ASSISTANT_IDENTITY, RECENT_CONVERSATION_HEADER};
use attache_core::error::AttacheError;
use attache_llm::{ChatTurn, LlmGateway, LlmRequest};
use attache_memory::Store;
use std::sync::Arc;

const CHAT_CONTEXT_MESSAGES: usize = 10;

pub struct ChatService {
    gateway: Arc<LlmGateway>,
    store: Store,
}

impl ChatService {
    pub fn new(gateway: Arc<LlmGateway>, store: Store) -> Self {
        Self { gateway, store }
    }

    /// Respond to free-form text for this user.
    pub async fn reply(&self, user_id: &str, text: &str) -> Result<String, AttacheError> {
        let recent = self
            .store
            .recent_context(user_id, CHAT_CONTEXT_MESSAGES)
            .await?;

        let mut system = ASSISTANT_IDENTITY.to_string();
        if !recent.is_empty() {
            let lines: Vec<String> = recent
                .iter()
                .flat_map(|ix| {
                    [
                        format!("User: {}", truncate(&ix.user_text, 100)),
                        format!("You: {}", truncate(&ix.reply_text, 150)),
                    ]
                })
                .collect();
            system.push_str(&format!(
                "\n\n{RECENT_CONVERSATION_HEADER}\n{}",
                lines.join("\n")
            ));
        }

        let request = LlmRequest {
            system,
            messages: vec![ChatTurn::user(text)],
            json: false,
        };

        let resp = self.gateway.complete(&request).await?;
        Ok(resp.text)
    }
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
