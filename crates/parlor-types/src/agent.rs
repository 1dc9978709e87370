//! Agent policy types shared between the core runtime and the boundary layer.

use serde::{Deserialize, Serialize};

/// Default number of prior messages recalled into a request.
pub const DEFAULT_RECALL_SIZE: usize = 100;

/// Whether and how an agent remembers prior turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MemoryPolicy {
    /// Every turn is stateless.
    #[default]
    None,
    /// Turns are recorded per conversation id and the last `recall_size`
    /// messages are injected into each request.
    PerConversation { recall_size: usize },
}

impl MemoryPolicy {
    pub fn per_conversation() -> Self {
        MemoryPolicy::PerConversation {
            recall_size: DEFAULT_RECALL_SIZE,
        }
    }

    /// Recall size when memory is active, `None` otherwise.
    pub fn recall_size(&self) -> Option<usize> {
        match self {
            MemoryPolicy::None => None,
            MemoryPolicy::PerConversation { recall_size } => Some(*recall_size),
        }
    }
}

/// A named substitution variable in a system-prompt template.
///
/// Without a default the placeholder is required: a turn whose caller does
/// not supply it fails with a template error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl PlaceholderSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }
}

/// Read-only view of an agent for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    pub name: String,
    pub description: String,
    pub tools: Vec<String>,
    pub placeholders: Vec<PlaceholderSpec>,
    pub memory: MemoryPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_stateless() {
        assert_eq!(MemoryPolicy::default(), MemoryPolicy::None);
        assert_eq!(MemoryPolicy::None.recall_size(), None);
    }

    #[test]
    fn test_per_conversation_default_recall() {
        assert_eq!(MemoryPolicy::per_conversation().recall_size(), Some(100));
    }

    #[test]
    fn test_memory_policy_serde() {
        let json = serde_json::to_string(&MemoryPolicy::PerConversation { recall_size: 20 }).unwrap();
        assert_eq!(json, r#"{"mode":"per_conversation","recall_size":20}"#);
        let parsed: MemoryPolicy = serde_json::from_str(r#"{"mode":"none"}"#).unwrap();
        assert_eq!(parsed, MemoryPolicy::None);
    }
}
