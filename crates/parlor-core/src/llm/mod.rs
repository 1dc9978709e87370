//! Completion-service abstractions for Parlor.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: object-safe wrapper for dynamic dispatch
//! - `ScriptedProvider`: replaying provider for tests (behind the `testing` feature)

pub mod box_provider;
pub mod provider;
#[cfg(any(test, feature = "testing"))]
pub mod scripted;
