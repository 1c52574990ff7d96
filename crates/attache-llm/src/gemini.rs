//! Google Gemini backend.
//!
//! Calls the `generateContent` endpoint. Auth via URL query param.

use crate::backend::{BackendError, LlmBackend, LlmRequest, LlmResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

pub(crate) const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    pub response_mime_type: String,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<GeminiInlineData>,
}

impl GeminiPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiInlineData {
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiResponse {
    pub candidates: Option<Vec<GeminiCandidate>>,
    pub usage_metadata: Option<GeminiUsage>,
}

#[derive(Deserialize)]
pub(crate) struct GeminiCandidate {
    pub content: Option<GeminiContent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiUsage {
    #[serde(default)]
    pub total_token_count: u64,
}

impl GeminiResponse {
    /// Pull the first candidate's first text part.
    pub fn first_text(&self) -> Option<String> {
        self.candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.clone())
    }
}

/// POST a request and parse the response, classifying failures.
pub(crate) async fn generate_content(
    client: &reqwest::Client,
    api_key: &str,
    model: &str,
    body: &GeminiRequest,
) -> Result<GeminiResponse, BackendError> {
    let url = format!("{GEMINI_BASE_URL}/models/{model}:generateContent?key={api_key}");
    debug!("gemini: POST models/{model}:generateContent");

    let resp = client
        .post(&url)
        .json(body)
        .send()
        .await
        .map_err(|e| BackendError::from_transport("gemini", e))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(BackendError::from_status("gemini", status, text));
    }

    resp.json()
        .await
        .map_err(|e| BackendError::Schema(format!("gemini: failed to parse response: {e}")))
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(
        &self,
        model: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, BackendError> {
        let start = Instant::now();

        let system_instruction = if request.system.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::text(request.system.clone())],
            })
        };

        let contents: Vec<GeminiContent> = request
            .messages
            .iter()
            .map(|m| {
                let role = if m.role == "assistant" { "model" } else { "user" };
                GeminiContent {
                    role: Some(role.to_string()),
                    parts: vec![GeminiPart::text(m.content.clone())],
                }
            })
            .collect();

        let body = GeminiRequest {
            contents,
            system_instruction,
            generation_config: request.json.then(|| GenerationConfig {
                response_mime_type: "application/json".to_string(),
            }),
        };

        let parsed = generate_content(&self.client, &self.api_key, model, &body).await?;

        let text = parsed
            .first_text()
            .ok_or_else(|| BackendError::Schema("gemini: response had no text".to_string()))?;

        Ok(LlmResponse {
            text,
            model: model.to_string(),
            tier: String::new(),
            tokens_used: parsed.usage_metadata.as_ref().map(|u| u.total_token_count),
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }
}
