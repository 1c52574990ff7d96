//! Email intelligence via an HTTP collaborator.
//!
//! The mailbox itself lives behind a separate service; this source just
//! forwards the question and relays the answer.

use async_trait::async_trait;
use attache_core::{error::AttacheError, traits::ContextSource};
use serde::Deserialize;

#[derive(Deserialize)]
struct AskResponse {
    #[serde(default)]
    answer: String,
}

pub struct EmailSource {
    client: reqwest::Client,
    base_url: String,
}

impl EmailSource {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl ContextSource for EmailSource {
    fn name(&self) -> &str {
        "email"
    }

    async fn fetch(&self, query: &str, _target_date: Option<&str>) -> Result<String, AttacheError> {
        if self.base_url.is_empty() {
            return Err(AttacheError::Service("email: not connected".to_string()));
        }

        let url = format!("{}/ask", self.base_url.trim_end_matches('/'));
        let resp: AskResponse = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| AttacheError::Service(format!("email fetch failed: {e}")))?
            .json()
            .await
            .map_err(|e| AttacheError::Service(format!("email parse failed: {e}")))?;

        if resp.answer.is_empty() {
            Ok("📧 No relevant email found.".to_string())
        } else {
            Ok(format!("📧 Email:\n{}", resp.answer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_response_parsing() {
        let resp: AskResponse =
            serde_json::from_str(r#"{"answer":"Two unread from finance."}"#).unwrap();
        assert_eq!(resp.answer, "Two unread from finance.");
    }

    #[test]
    fn test_missing_answer_defaults_empty() {
        let resp: AskResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.answer.is_empty());
    }
}
