//! Voice transcription via Gemini inline audio.

use crate::gemini::{
    generate_content, GeminiContent, GeminiInlineData, GeminiPart, GeminiRequest,
};
use async_trait::async_trait;
use attache_core::{error::AttacheError, traits::Transcriber};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::time::Duration;
use tracing::debug;

const TRANSCRIBE_PROMPT: &str =
    "Transcribe this audio exactly as spoken. Output only the transcription, \
     with no commentary. Keep the original language (Hebrew or English).";

const TRANSCRIBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Speech-to-text using a Gemini model with inline audio data.
pub struct GeminiTranscriber {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiTranscriber {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Transcriber for GeminiTranscriber {
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String, AttacheError> {
        debug!(
            "transcribe: {} bytes of {mime_type} via {}",
            audio.len(),
            self.model
        );

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![
                    GeminiPart::text(TRANSCRIBE_PROMPT),
                    GeminiPart {
                        text: None,
                        inline_data: Some(GeminiInlineData {
                            mime_type: mime_type.to_string(),
                            data: BASE64.encode(audio),
                        }),
                    },
                ],
            }],
            system_instruction: None,
            generation_config: None,
        };

        let resp = tokio::time::timeout(
            TRANSCRIBE_TIMEOUT,
            generate_content(&self.client, &self.api_key, &self.model, &body),
        )
        .await
        .map_err(|_| AttacheError::Llm("transcription timed out".to_string()))?
        .map_err(|e| AttacheError::Llm(format!("transcription failed: {e}")))?;

        resp.first_text()
            .map(|t| t.trim().to_string())
            .ok_or_else(|| AttacheError::Llm("transcription returned no text".to_string()))
    }
}
