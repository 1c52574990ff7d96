//! # attache-core
//!
//! Core types, traits, configuration, and error handling for the Attache
//! assistant.

pub mod config;
pub mod error;
pub mod intent;
pub mod message;
pub mod sanitize;
pub mod traits;

pub use config::shellexpand;
