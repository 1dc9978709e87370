//! Infrastructure layer for Parlor.
//!
//! Contains the concrete pieces `parlor-core` leaves abstract: the
//! OpenAI-compatible completion provider, the TOML configuration loader, and
//! the shipped personas with their in-memory tool backends.

pub mod agents;
pub mod config;
pub mod llm;
