//! Conversation memory, tool dispatch and turn orchestration for Parlor.
//!
//! This crate defines the completion-service port (`LlmProvider`) that the
//! infrastructure layer implements. It depends only on `parlor-types` --
//! never on `parlor-infra` or any HTTP crate.

pub mod agent;
pub mod llm;
pub mod memory;
pub mod tool;
