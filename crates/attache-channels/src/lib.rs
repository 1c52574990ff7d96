//! # attache-channels
//!
//! Messaging platform integrations for Attache.

pub mod telegram;
