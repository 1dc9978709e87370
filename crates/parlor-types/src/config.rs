//! Runtime configuration types for Parlor.
//!
//! `RuntimeConfig` represents the top-level `config.toml`. Every field has a
//! default, so an empty or missing file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::agent::DEFAULT_RECALL_SIZE;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Conversation memory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Recall window used by personas that do not set their own.
    #[serde(default = "default_recall_size")]
    pub default_recall_size: usize,
}

fn default_recall_size() -> usize {
    DEFAULT_RECALL_SIZE
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            default_recall_size: default_recall_size(),
        }
    }
}

/// Turn orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum tool-call rounds per turn before `ToolLoopOverflow`.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: Option<f64>,
}

fn default_max_tool_rounds() -> u32 {
    5
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> Option<f64> {
    Some(0.7)
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Completion service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Human-readable provider name (e.g. "openai").
    #[serde(default = "default_provider_name")]
    pub name: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_name() -> String {
    "openai".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_config_default_values() {
        let config = RuntimeConfig::default();
        assert_eq!(config.memory.default_recall_size, 100);
        assert_eq!(config.orchestrator.max_tool_rounds, 5);
        assert_eq!(config.provider.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_runtime_config_deserialize_empty() {
        let config: RuntimeConfig = toml::from_str("").unwrap();
        assert_eq!(config.memory.default_recall_size, 100);
        assert_eq!(config.orchestrator.max_tokens, 1024);
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_runtime_config_deserialize_partial_sections() {
        let toml_str = r#"
[memory]
default_recall_size = 20

[orchestrator]
max_tool_rounds = 3

[provider]
name = "local"
base_url = "http://localhost:11434/v1"
model = "llama3.1"
"#;
        let config: RuntimeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.memory.default_recall_size, 20);
        assert_eq!(config.orchestrator.max_tool_rounds, 3);
        assert_eq!(config.orchestrator.max_tokens, 1024);
        assert_eq!(config.provider.name, "local");
        assert_eq!(config.provider.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.server.port, 8080);
    }
}
