//! Groq backend (OpenAI-compatible chat completions API).

use crate::backend::{BackendError, ChatTurn, LlmBackend, LlmRequest, LlmResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

pub struct GroqBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GroqBackend {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: GROQ_BASE_URL.to_string(),
            api_key,
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatTurn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<ChatChoice>>,
    model: Option<String>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: Option<u64>,
}

/// Prepend the system instruction as an OpenAI-style system message.
fn build_messages(request: &LlmRequest) -> Vec<ChatTurn> {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if !request.system.is_empty() {
        messages.push(ChatTurn {
            role: "system".to_string(),
            content: request.system.clone(),
        });
    }
    messages.extend(request.messages.iter().cloned());
    messages
}

#[async_trait]
impl LlmBackend for GroqBackend {
    fn name(&self) -> &str {
        "groq"
    }

    async fn complete(
        &self,
        model: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, BackendError> {
        let start = Instant::now();

        let body = ChatCompletionRequest {
            model: model.to_string(),
            messages: build_messages(request),
            response_format: request.json.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("groq: POST {url} model={model}");

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::from_transport("groq", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(BackendError::from_status("groq", status, text));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| BackendError::Schema(format!("groq: failed to parse response: {e}")))?;

        let text = parsed
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.clone())
            .ok_or_else(|| BackendError::Schema("groq: response had no content".to_string()))?;

        Ok(LlmResponse {
            text,
            model: parsed.model.unwrap_or_else(|| model.to_string()),
            tier: String::new(),
            tokens_used: parsed.usage.as_ref().and_then(|u| u.total_tokens),
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }
}
