use thiserror::Error;

use crate::llm::LlmError;

/// Errors from building or querying a tool registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("unknown tool '{0}'")]
    UnknownTool(String),
}

/// Errors from parsing or resolving a system-prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("placeholder '{0}' has no value and no default")]
    MissingPlaceholder(String),

    #[error("malformed template at byte {position}: {reason}")]
    Malformed { position: usize, reason: String },
}

/// Errors from assembling an agent definition at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentBuildError {
    #[error("agent '{agent}': {source}")]
    Template {
        agent: String,
        #[source]
        source: TemplateError,
    },

    #[error("agent '{agent}': {source}")]
    Registry {
        agent: String,
        #[source]
        source: RegistryError,
    },

    #[error("agent '{0}' is already registered")]
    DuplicateAgent(String),
}

/// Errors from looking up agents by name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("unknown agent '{0}'")]
    UnknownAgent(String),
}

/// Errors that abort a turn. None of them leave a trace in conversation memory.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("completion service failed: {0}")]
    Transport(#[from] LlmError),

    #[error("tool loop exceeded {limit} rounds")]
    ToolLoopOverflow { limit: u32 },

    #[error("turn cancelled")]
    Cancelled,
}

impl TurnError {
    /// Stable category string for caller-facing error payloads.
    pub fn category(&self) -> &'static str {
        match self {
            TurnError::Template(_) => "template_error",
            TurnError::Transport(_) => "transport_error",
            TurnError::ToolLoopOverflow { .. } => "tool_loop_overflow",
            TurnError::Cancelled => "cancelled",
        }
    }
}
