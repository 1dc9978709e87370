//! Agent definitions: persona template, bound tools, memory policy.
//!
//! Definitions are assembled once at startup through [`AgentDefinitionBuilder`]
//! and shared read-only (behind `Arc`) by every turn.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parlor_types::agent::{AgentSummary, MemoryPolicy, PlaceholderSpec};
use parlor_types::error::{AgentBuildError, TemplateError};

use crate::tool::{ToolRegistry, ToolSpec};

use super::template::PromptTemplate;

/// A placeholder whose value is computed when each turn starts, unless the
/// caller supplies it.
#[derive(Clone)]
pub struct TurnParam {
    name: String,
    value: Arc<dyn Fn() -> String + Send + Sync>,
}

impl fmt::Debug for TurnParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnParam").field("name", &self.name).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct AgentDefinition {
    name: String,
    description: String,
    template: PromptTemplate,
    turn_params: Vec<TurnParam>,
    tools: ToolRegistry,
    memory: MemoryPolicy,
}

impl AgentDefinition {
    pub fn builder(name: impl Into<String>) -> AgentDefinitionBuilder {
        AgentDefinitionBuilder {
            name: name.into(),
            description: String::new(),
            system_prompt: String::new(),
            placeholders: Vec::new(),
            turn_params: Vec::new(),
            shared_tools: None,
            own_tools: Vec::new(),
            memory: MemoryPolicy::None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Resolve the system prompt for one turn. Caller params win over turn
    /// params, which win over declared defaults.
    pub fn render_prompt(&self, params: &HashMap<String, String>) -> Result<String, TemplateError> {
        let missing: Vec<&TurnParam> = self
            .turn_params
            .iter()
            .filter(|p| !params.contains_key(&p.name))
            .collect();
        if missing.is_empty() {
            return self.template.resolve(params);
        }

        let mut merged = params.clone();
        for param in missing {
            merged.insert(param.name.clone(), (param.value)());
        }
        self.template.resolve(&merged)
    }

    /// The agent's bound tool set. Dispatch never looks outside it.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn memory(&self) -> MemoryPolicy {
        self.memory
    }

    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            tools: self.tools.names().into_iter().map(str::to_string).collect(),
            placeholders: self
                .template
                .placeholders()
                .iter()
                .filter(|p| !self.turn_params.iter().any(|t| t.name == p.name))
                .cloned()
                .collect(),
            memory: self.memory,
        }
    }
}

pub struct AgentDefinitionBuilder {
    name: String,
    description: String,
    system_prompt: String,
    placeholders: Vec<PlaceholderSpec>,
    turn_params: Vec<TurnParam>,
    shared_tools: Option<ToolRegistry>,
    own_tools: Vec<ToolSpec>,
    memory: MemoryPolicy,
}

impl AgentDefinitionBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn system_prompt(mut self, template: impl Into<String>) -> Self {
        self.system_prompt = template.into();
        self
    }

    pub fn placeholder(mut self, placeholder: PlaceholderSpec) -> Self {
        self.placeholders.push(placeholder);
        self
    }

    /// Fill `name` from `value` at the start of every turn.
    pub fn turn_param(mut self, name: impl Into<String>, value: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.turn_params.push(TurnParam {
            name: name.into(),
            value: Arc::new(value),
        });
        self
    }

    /// Bind an existing registry (or a subset of a shared one).
    pub fn tools(mut self, registry: ToolRegistry) -> Self {
        self.shared_tools = Some(registry);
        self
    }

    /// Bind one more tool on top of any registry given to [`tools`](Self::tools).
    pub fn tool(mut self, spec: ToolSpec) -> Self {
        self.own_tools.push(spec);
        self
    }

    pub fn memory(mut self, policy: MemoryPolicy) -> Self {
        self.memory = policy;
        self
    }

    pub fn build(self) -> Result<AgentDefinition, AgentBuildError> {
        let name = self.name;

        let template = PromptTemplate::new(self.system_prompt, self.placeholders).map_err(|source| {
            AgentBuildError::Template {
                agent: name.clone(),
                source,
            }
        })?;

        let tools = match (self.shared_tools, self.own_tools.is_empty()) {
            (Some(shared), true) => shared,
            (None, true) => ToolRegistry::empty(),
            (shared, false) => {
                let registry_err = |source| AgentBuildError::Registry {
                    agent: name.clone(),
                    source,
                };
                let mut builder = ToolRegistry::builder();
                for spec in shared.iter().flat_map(ToolRegistry::specs) {
                    builder.insert_shared(spec.clone()).map_err(registry_err)?;
                }
                for spec in self.own_tools {
                    builder.register(spec).map_err(registry_err)?;
                }
                builder.build()
            }
        };

        Ok(AgentDefinition {
            name,
            description: self.description,
            template,
            turn_params: self.turn_params,
            tools,
            memory: self.memory,
        })
    }
}
