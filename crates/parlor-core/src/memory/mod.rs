//! Per-conversation message memory.

pub mod store;

pub use store::{ConversationMemoryStore, RecallWindow, TurnPermit};
