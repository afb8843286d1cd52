//! Service module for the remote chat-completion API

pub(crate) mod chat;

pub use chat::{complete_chat, DEFAULT_RETRY_AFTER};
