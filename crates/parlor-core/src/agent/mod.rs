//! Agents and turn orchestration.
//!
//! - `PromptTemplate`: persona template with `{placeholder}` substitution
//! - `AgentDefinition`: template + bound tools + memory policy, immutable
//! - `AgentCatalog`: name -> definition lookup for the routing layer
//! - `TurnOrchestrator`: runs a turn (blocking or streamed) end to end

pub mod catalog;
pub mod definition;
pub mod orchestrator;
pub mod streaming;
pub mod template;

pub use catalog::AgentCatalog;
pub use definition::{AgentDefinition, AgentDefinitionBuilder};
pub use orchestrator::{OrchestratorSettings, TurnOrchestrator, TurnOutcome, TurnRequest};
pub use streaming::{TurnEvent, TurnStream};
pub use template::PromptTemplate;
