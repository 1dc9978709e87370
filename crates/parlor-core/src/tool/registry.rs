//! Immutable tool registry.
//!
//! Built once through [`ToolRegistryBuilder`] and never mutated afterwards.
//! Clones share the underlying map, so handing a registry to many concurrent
//! turns is free.

use std::collections::HashMap;
use std::sync::Arc;

use parlor_types::error::RegistryError;
use parlor_types::llm::ToolDefinition;

use super::spec::ToolSpec;

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<HashMap<String, Arc<ToolSpec>>>,
    order: Arc<Vec<String>>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// A registry with no tools.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a tool by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<ToolSpec>, RegistryError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Definitions for every tool, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|spec| spec.definition())
            .collect()
    }

    pub(crate) fn specs(&self) -> impl Iterator<Item = &Arc<ToolSpec>> {
        self.order.iter().filter_map(|name| self.tools.get(name))
    }

    /// A new registry restricted to `names`, in the order given.
    pub fn subset(&self, names: &[&str]) -> Result<ToolRegistry, RegistryError> {
        let mut builder = ToolRegistry::builder();
        for name in names {
            let spec = self.resolve(name)?;
            builder.insert_shared(spec)?;
        }
        Ok(builder.build())
    }
}

#[derive(Debug, Default)]
pub struct ToolRegistryBuilder {
    tools: HashMap<String, Arc<ToolSpec>>,
    order: Vec<String>,
}

impl ToolRegistryBuilder {
    /// Add a tool. Names must be unique.
    pub fn register(&mut self, spec: ToolSpec) -> Result<&mut Self, RegistryError> {
        self.insert_shared(Arc::new(spec))
    }

    /// Chaining form of [`register`](Self::register).
    pub fn with(mut self, spec: ToolSpec) -> Result<Self, RegistryError> {
        self.register(spec)?;
        Ok(self)
    }

    pub fn build(self) -> ToolRegistry {
        ToolRegistry {
            tools: Arc::new(self.tools),
            order: Arc::new(self.order),
        }
    }

    pub(crate) fn insert_shared(&mut self, spec: Arc<ToolSpec>) -> Result<&mut Self, RegistryError> {
        let name = spec.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        self.order.push(name.clone());
        self.tools.insert(name, spec);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::tool_fn;
    use serde_json::Value;

    fn noop(name: &str) -> ToolSpec {
        ToolSpec::new(name, format!("{name} tool"), tool_fn(|_| async { Ok(Value::Null) }))
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::builder()
            .with(noop("get_booking_details"))
            .unwrap()
            .with(noop("change_booking"))
            .unwrap()
            .with(noop("cancel_booking"))
            .unwrap()
            .build()
    }

    #[test]
    fn test_resolve_registered_tool() {
        let reg = registry();
        assert_eq!(reg.resolve("change_booking").unwrap().name(), "change_booking");
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn test_resolve_unknown_tool() {
        let err = registry().resolve("delete_everything").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownTool(name) if name == "delete_everything"));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut builder = ToolRegistry::builder();
        builder.register(noop("lookup")).unwrap();
        let err = builder.register(noop("lookup")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool(name) if name == "lookup"));
    }

    #[test]
    fn test_definitions_keep_registration_order() {
        let names: Vec<String> = registry().definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec!["get_booking_details", "change_booking", "cancel_booking"]
        );
    }

    #[test]
    fn test_subset() {
        let reg = registry();
        let sub = reg.subset(&["cancel_booking", "get_booking_details"]).unwrap();
        assert_eq!(sub.names(), vec!["cancel_booking", "get_booking_details"]);
        assert!(!sub.contains("change_booking"));

        assert!(matches!(
            reg.subset(&["nope"]),
            Err(RegistryError::UnknownTool(_))
        ));
        assert!(matches!(
            reg.subset(&["change_booking", "change_booking"]),
            Err(RegistryError::DuplicateTool(_))
        ));
    }

    #[test]
    fn test_empty_registry() {
        let reg = ToolRegistry::empty();
        assert!(reg.is_empty());
        assert!(reg.definitions().is_empty());
    }
}
