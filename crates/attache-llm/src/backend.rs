//! The backend abstraction every vendor adapter implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failure from one backend attempt.
///
/// The split decides gateway behavior: transient failures are retried
/// within the tier, everything else falls through to the next tier.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Rate limit, overload, timeout, or network trouble. Worth retrying.
    #[error("transient: {0}")]
    Transient(String),

    /// Bad request, auth failure, or any other error retrying won't fix.
    #[error("fatal: {0}")]
    Fatal(String),

    /// The backend answered but the response body didn't parse.
    #[error("schema: {0}")]
    Schema(String),
}

impl BackendError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Classify an HTTP status into transient vs fatal.
    pub fn from_status(backend: &str, status: reqwest::StatusCode, body: String) -> Self {
        let msg = format!("{backend} returned {status}: {body}");
        if status.as_u16() == 408 || status.as_u16() == 429 || status.is_server_error() {
            Self::Transient(msg)
        } else {
            Self::Fatal(msg)
        }
    }

    /// Classify a reqwest transport error. Connection and timeout problems
    /// are transient; anything else (e.g. a bad URL) is not.
    pub fn from_transport(backend: &str, e: reqwest::Error) -> Self {
        let msg = format!("{backend} request failed: {e}");
        if e.is_timeout() || e.is_connect() || e.is_request() {
            Self::Transient(msg)
        } else {
            Self::Fatal(msg)
        }
    }
}

/// One turn in a conversation sent to a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A vendor-neutral completion request.
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    /// System instruction, prepended in whatever form the vendor expects.
    pub system: String,
    pub messages: Vec<ChatTurn>,
    /// Ask the backend for a JSON object response (classifier calls).
    pub json: bool,
}

impl LlmRequest {
    /// A single-turn request with a system instruction.
    pub fn single(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            messages: vec![ChatTurn::user(user)],
            json: false,
        }
    }

    pub fn json_mode(mut self) -> Self {
        self.json = true;
        self
    }
}

/// A normalized completion response. Identical shape regardless of vendor.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    /// The model that actually answered.
    pub model: String,
    /// Tier label, filled in by the gateway.
    pub tier: String,
    pub tokens_used: Option<u64>,
    pub elapsed_ms: u64,
}

/// A language-model backend. One implementation per vendor API.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Backend identifier ("groq", "gemini").
    fn name(&self) -> &str;

    /// Run one completion attempt against the given model.
    async fn complete(&self, model: &str, request: &LlmRequest) -> Result<LlmResponse, BackendError>;
}
