//! Long-polling update loop and Channel trait implementation.

use super::types::{TgFile, TgResponse, TgUpdate};
use super::TelegramChannel;
use async_trait::async_trait;
use attache_core::{
    error::AttacheError,
    message::{InboundMessage, OutboundMessage, VoiceAttachment},
    traits::Channel,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<mpsc::Receiver<InboundMessage>, AttacheError> {
        let (tx, rx) = mpsc::channel(64);
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let bot_token = self.config.bot_token.clone();
        let last_update_id = self.last_update_id.clone();

        info!("Telegram channel starting long polling...");

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            loop {
                let last = last_update_id.lock().await;
                let offset = last.map(|id| id + 1);
                drop(last);

                let mut url = format!("{base_url}/getUpdates?timeout=30");
                if let Some(off) = offset {
                    url.push_str(&format!("&offset={off}"));
                }

                let resp = match client
                    .get(&url)
                    .timeout(std::time::Duration::from_secs(35))
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        error!("telegram poll error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let body: TgResponse<Vec<TgUpdate>> = match resp.json().await {
                    Ok(b) => b,
                    Err(e) => {
                        error!("telegram parse error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                if !body.ok {
                    error!(
                        "telegram API error (retry in {backoff_secs}s): {}",
                        body.description.unwrap_or_default()
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(60);
                    continue;
                }

                // Successful poll -- reset backoff.
                backoff_secs = 1;

                let updates = body.result.unwrap_or_default();

                if let Some(last_update) = updates.last() {
                    *last_update_id.lock().await = Some(last_update.update_id);
                }

                for update in updates {
                    let msg = match update.message {
                        Some(m) => m,
                        None => continue,
                    };

                    // Attache only interacts person-to-person.
                    let is_group = matches!(msg.chat.chat_type.as_str(), "group" | "supergroup");
                    if is_group {
                        debug!("telegram: ignoring group message from chat {}", msg.chat.id);
                        continue;
                    }

                    let user = match msg.from {
                        Some(u) => u,
                        None => continue,
                    };

                    let (text, voice) = if let Some(t) = msg.text {
                        (t, None)
                    } else if let Some(ref v) = msg.voice {
                        // Voice bytes ride along; the pipeline transcribes.
                        match download_telegram_file(&client, &base_url, &bot_token, &v.file_id)
                            .await
                        {
                            Ok(bytes) => {
                                info!("telegram: downloaded voice message ({}s)", v.duration);
                                let attachment = VoiceAttachment {
                                    data: bytes,
                                    mime_type: v
                                        .mime_type
                                        .clone()
                                        .unwrap_or_else(|| "audio/ogg".to_string()),
                                    duration_secs: v.duration.max(0) as u32,
                                };
                                (String::new(), Some(attachment))
                            }
                            Err(e) => {
                                warn!("voice download failed: {e}");
                                continue;
                            }
                        }
                    } else {
                        continue;
                    };

                    let sender_name = if let Some(ref un) = user.username {
                        format!("@{un}")
                    } else if let Some(ref ln) = user.last_name {
                        format!("{} {ln}", user.first_name)
                    } else {
                        user.first_name.clone()
                    };

                    // update_id is the delivery identifier the dedup ledger
                    // keys on; it is stable across redeliveries.
                    let incoming = InboundMessage {
                        id: update.update_id.to_string(),
                        channel: "telegram".to_string(),
                        sender_id: user.id.to_string(),
                        sender_name: Some(sender_name),
                        text,
                        timestamp: chrono::Utc::now(),
                        voice,
                        reply_target: Some(msg.chat.id.to_string()),
                    };

                    if tx.send(incoming).await.is_err() {
                        info!("telegram channel receiver dropped, stopping poll");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send_typing(&self, target: &str) -> Result<(), AttacheError> {
        let chat_id: i64 = target.parse().map_err(|e| {
            AttacheError::Channel(format!("invalid telegram chat_id '{target}': {e}"))
        })?;
        self.send_chat_action(chat_id, "typing").await
    }

    async fn send(&self, message: OutboundMessage) -> Result<(), AttacheError> {
        let chat_id_str = message
            .reply_target
            .as_deref()
            .ok_or_else(|| AttacheError::Channel("no reply_target on outgoing message".into()))?;

        let chat_id: i64 = chat_id_str.parse().map_err(|e| {
            AttacheError::Channel(format!("invalid telegram chat_id '{chat_id_str}': {e}"))
        })?;

        self.send_text(chat_id, &message.text).await
    }

    async fn stop(&self) -> Result<(), AttacheError> {
        info!("Telegram channel stopped");
        Ok(())
    }
}

/// Download a file from Telegram servers by file_id.
async fn download_telegram_file(
    client: &reqwest::Client,
    base_url: &str,
    bot_token: &str,
    file_id: &str,
) -> Result<Vec<u8>, AttacheError> {
    // Step 1: getFile to obtain file_path.
    let url = format!("{base_url}/getFile?file_id={file_id}");
    let resp: TgResponse<TgFile> = client
        .get(&url)
        .send()
        .await
        .map_err(|e| AttacheError::Channel(format!("telegram getFile failed: {e}")))?
        .json()
        .await
        .map_err(|e| AttacheError::Channel(format!("telegram getFile parse failed: {e}")))?;

    let file_path = resp
        .result
        .and_then(|f| f.file_path)
        .ok_or_else(|| AttacheError::Channel("telegram getFile returned no file_path".into()))?;

    // Step 2: Download the actual file bytes.
    let download_url = format!("https://api.telegram.org/file/bot{bot_token}/{file_path}");
    let bytes = client
        .get(&download_url)
        .send()
        .await
        .map_err(|e| AttacheError::Channel(format!("telegram file download failed: {e}")))?
        .bytes()
        .await
        .map_err(|e| AttacheError::Channel(format!("telegram file read failed: {e}")))?;

    Ok(bytes.to_vec())
}
