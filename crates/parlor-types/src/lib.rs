//! Shared domain types for Parlor.
//!
//! Messages, tool schemas and results, agent policies, configuration and the
//! error taxonomy. Zero infrastructure dependencies -- only serde and
//! thiserror.

pub mod agent;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod tool;
