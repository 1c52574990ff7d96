//! # attache-llm
//!
//! The tiered language-model gateway and its backends.
//!
//! The gateway walks an ordered list of backend/model tiers, retrying
//! transient failures within a tier and falling through to the next tier
//! otherwise. Callers see one uniform interface and one uniform failure
//! mode ("all tiers exhausted"); they never learn which vendor answered
//! except through response metadata.

pub mod backend;
pub mod gateway;
pub mod gemini;
pub mod groq;
pub mod transcribe;

pub use backend::{BackendError, ChatTurn, LlmBackend, LlmRequest, LlmResponse};
pub use gateway::{LlmGateway, Tier};
