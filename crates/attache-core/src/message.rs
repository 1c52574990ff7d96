use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An inbound message from a channel.
///
/// `id` is the channel's delivery identifier (e.g. the Telegram
/// `update_id`). The channel may redeliver the same identifier; the
/// deduplication ledger guarantees at-most-once processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Delivery identifier, stable across redeliveries of the same update.
    pub id: String,
    /// Channel name (e.g. "telegram").
    pub channel: String,
    /// Platform-specific user ID.
    pub sender_id: String,
    /// Human-readable sender name.
    pub sender_name: Option<String>,
    /// Message text content. Empty when the message is voice-only.
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Voice audio payload, transcribed by the pipeline.
    #[serde(default)]
    pub voice: Option<VoiceAttachment>,
    /// Platform-specific target for routing the response (e.g. Telegram chat_id).
    #[serde(default)]
    pub reply_target: Option<String>,
}

/// Voice message bytes downloaded by the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceAttachment {
    pub data: Vec<u8>,
    /// MIME type (Telegram voice notes are "audio/ogg").
    pub mime_type: String,
    pub duration_secs: u32,
}

/// An outbound reply to send back through a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub text: String,
    pub metadata: ReplyMetadata,
    /// Platform-specific target for routing (e.g. Telegram chat_id).
    #[serde(default)]
    pub reply_target: Option<String>,
}

/// Metadata about how a reply was produced.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReplyMetadata {
    /// Which gateway tier served the request, if any.
    pub tier_used: Option<String>,
    /// Model identifier (if applicable).
    pub model: Option<String>,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
}

impl OutboundMessage {
    /// A plain text reply addressed back to the sender of `incoming`.
    pub fn reply_to(incoming: &InboundMessage, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: ReplyMetadata::default(),
            reply_target: incoming.reply_target.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(target: Option<&str>) -> InboundMessage {
        InboundMessage {
            id: "100".into(),
            channel: "telegram".into(),
            sender_id: "42".into(),
            sender_name: Some("Shay".into()),
            text: "hello".into(),
            timestamp: Utc::now(),
            voice: None,
            reply_target: target.map(String::from),
        }
    }

    #[test]
    fn test_reply_to_carries_target() {
        let msg = OutboundMessage::reply_to(&inbound(Some("7")), "hi");
        assert_eq!(msg.text, "hi");
        assert_eq!(msg.reply_target.as_deref(), Some("7"));
    }

    #[test]
    fn test_reply_to_without_target() {
        let msg = OutboundMessage::reply_to(&inbound(None), "hi");
        assert!(msg.reply_target.is_none());
    }

    #[test]
    fn test_inbound_voice_defaults_to_none() {
        let json = r#"{"id":"1","channel":"telegram","sender_id":"42",
            "sender_name":null,"text":"hi","timestamp":"2026-02-17T09:00:00Z"}"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        assert!(msg.voice.is_none());
        assert!(msg.reply_target.is_none());
    }
}
