//! HTTP request handlers.

pub mod agents;
pub mod chat;
pub mod conversation;
pub mod legacy;
