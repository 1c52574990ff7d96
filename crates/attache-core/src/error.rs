use thiserror::Error;

/// Top-level error type for Attache.
#[derive(Debug, Error)]
pub enum AttacheError {
    /// Error from the language-model gateway or one of its backends.
    #[error("llm error: {0}")]
    Llm(String),

    /// Error from a messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Durable-store error. These are the only failures allowed to abort
    /// message handling: without the store the dedup and confirmation
    /// guarantees cannot be honored.
    #[error("storage error: {0}")]
    Storage(String),

    /// Error from a domain service or context source.
    #[error("service error: {0}")]
    Service(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
