//! Name-indexed set of agent definitions.

use std::collections::HashMap;
use std::sync::Arc;

use parlor_types::agent::AgentSummary;
use parlor_types::error::{AgentBuildError, CatalogError};

use super::definition::AgentDefinition;

/// Immutable catalog of agents, built at startup.
#[derive(Debug, Clone, Default)]
pub struct AgentCatalog {
    agents: HashMap<String, Arc<AgentDefinition>>,
    order: Vec<String>,
}

impl AgentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent. Names must be unique.
    pub fn register(&mut self, agent: AgentDefinition) -> Result<(), AgentBuildError> {
        let name = agent.name().to_string();
        if self.agents.contains_key(&name) {
            return Err(AgentBuildError::DuplicateAgent(name));
        }
        self.order.push(name.clone());
        self.agents.insert(name, Arc::new(agent));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<AgentDefinition>, CatalogError> {
        self.agents
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownAgent(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Summaries in registration order.
    pub fn summaries(&self) -> Vec<AgentSummary> {
        self.order
            .iter()
            .filter_map(|name| self.agents.get(name))
            .map(|agent| agent.summary())
            .collect()
    }
}
