//! Outbound Bot API calls.

use super::types::TgResponse;
use super::TelegramChannel;
use attache_core::error::AttacheError;
use serde_json::json;
use tracing::debug;

impl TelegramChannel {
    /// Send a plain text message.
    pub(crate) async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), AttacheError> {
        let url = format!("{}/sendMessage", self.base_url);
        let body = json!({
            "chat_id": chat_id,
            "text": text,
        });

        let resp: TgResponse<serde_json::Value> = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AttacheError::Channel(format!("telegram sendMessage failed: {e}")))?
            .json()
            .await
            .map_err(|e| AttacheError::Channel(format!("telegram sendMessage parse failed: {e}")))?;

        if !resp.ok {
            return Err(AttacheError::Channel(format!(
                "telegram sendMessage rejected: {}",
                resp.description.unwrap_or_default()
            )));
        }

        debug!("telegram: sent {} chars to chat {chat_id}", text.len());
        Ok(())
    }

    /// Send a chat action ("typing" etc). Failures are non-fatal.
    pub(crate) async fn send_chat_action(
        &self,
        chat_id: i64,
        action: &str,
    ) -> Result<(), AttacheError> {
        let url = format!("{}/sendChatAction", self.base_url);
        let body = json!({
            "chat_id": chat_id,
            "action": action,
        });

        self.client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AttacheError::Channel(format!("telegram sendChatAction failed: {e}")))?;

        Ok(())
    }
}
