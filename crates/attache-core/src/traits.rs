use crate::{
    error::AttacheError,
    intent::IntentDecision,
    message::{InboundMessage, OutboundMessage},
};
use async_trait::async_trait;

/// Messaging Channel trait.
///
/// Every messaging platform (Telegram today, others later) implements this
/// trait to receive and send messages.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for incoming messages.
    /// Returns a receiver that yields incoming messages.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<InboundMessage>, AttacheError>;

    /// Send a response back through this channel.
    async fn send(&self, message: OutboundMessage) -> Result<(), AttacheError>;

    /// Send a typing indicator to show the bot is processing.
    async fn send_typing(&self, _target: &str) -> Result<(), AttacheError> {
        Ok(())
    }

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), AttacheError>;
}

/// A domain service the dispatcher can invoke for one action type.
///
/// Implementations own their side effects (database writes, HTTP calls)
/// and return a user-facing reply string.
#[async_trait]
pub trait DomainService: Send + Sync {
    /// Service name, used in dispatch logs.
    fn name(&self) -> &str;

    /// Execute the classified intent for this user.
    async fn execute(
        &self,
        user_id: &str,
        decision: &IntentDecision,
    ) -> Result<String, AttacheError>;
}

/// One external context source the query service can fetch from.
///
/// Fetches run in parallel with a per-source timeout; a failure or
/// timeout degrades that source to a placeholder, never the whole answer.
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// Source name, used as the section label in the synthesis prompt.
    fn name(&self) -> &str;

    /// Fetch a plain-text context block for the given query.
    async fn fetch(&self, query: &str, target_date: Option<&str>) -> Result<String, AttacheError>;
}

/// Speech-to-text for voice messages.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe audio bytes into text.
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String, AttacheError>;
}
