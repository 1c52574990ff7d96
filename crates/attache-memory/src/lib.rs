//! # attache-memory
//!
//! SQLite-backed durable state for Attache: the deduplication ledger,
//! the confirmation state machine's persisted rows, the interaction log,
//! and the task/note tables behind the domain services.

pub mod store;

pub use store::Store;
