//! General chat assistant that answers in a caller-chosen voice.

use parlor_core::agent::AgentDefinition;
use parlor_types::agent::{MemoryPolicy, PlaceholderSpec};
use parlor_types::error::AgentBuildError;

pub const AGENT_NAME: &str = "assistant";

pub const VOICE_PLACEHOLDER: &str = "voice";

pub const DEFAULT_VOICE: &str = "Normal man";

const SYSTEM_PROMPT: &str = "You are a friendly chat bot that answers question in the voice of a {voice}";

/// No tools. Memory is per conversation; callers without a conversation id
/// get stateless turns.
pub fn agent(recall_size: usize) -> Result<AgentDefinition, AgentBuildError> {
    AgentDefinition::builder(AGENT_NAME)
        .description("Friendly chat bot that answers in the voice of your choice")
        .system_prompt(SYSTEM_PROMPT)
        .placeholder(PlaceholderSpec::with_default(VOICE_PLACEHOLDER, DEFAULT_VOICE))
        .memory(MemoryPolicy::PerConversation { recall_size })
        .build()
}
