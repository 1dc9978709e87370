//! Tool specification: name, description, parameter schema, handler.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value, json};

use parlor_types::llm::ToolDefinition;
use parlor_types::tool::{ParamType, ToolParameter};

use super::handler::{ToolHandler, ToolHandlerDyn};

/// A local function exposed to the model.
///
/// Built with a chained `.param(..)` / `.required(..)` API; parameter order is
/// preserved in the rendered JSON Schema.
#[derive(Clone)]
pub struct ToolSpec {
    name: String,
    description: String,
    parameters: Vec<ToolParameter>,
    handler: Arc<dyn ToolHandlerDyn>,
}

impl ToolSpec {
    pub fn new<H>(name: impl Into<String>, description: impl Into<String>, handler: H) -> Self
    where
        H: ToolHandler + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn param(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Shorthand for a required parameter.
    pub fn required(self, name: &str, param_type: ParamType, description: &str) -> Self {
        self.param(ToolParameter::required(name, param_type, description))
    }

    /// Shorthand for an optional parameter.
    pub fn optional(self, name: &str, param_type: ParamType, description: &str) -> Self {
        self.param(ToolParameter::optional(name, param_type, description))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &[ToolParameter] {
        &self.parameters
    }

    pub(crate) fn handler(&self) -> &dyn ToolHandlerDyn {
        self.handler.as_ref()
    }

    /// Definition advertised to the completion service.
    pub fn definition(&self) -> ToolDefinition {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for p in &self.parameters {
            let mut schema = p.param_type.json_schema();
            if !p.description.is_empty() {
                if let Value::Object(obj) = &mut schema {
                    obj.insert("description".into(), Value::String(p.description.clone()));
                }
            }
            properties.insert(p.name.clone(), schema);
            if p.required {
                required.push(Value::String(p.name.clone()));
            }
        }

        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: json!({
                "type": "object",
                "properties": Value::Object(properties),
                "required": required,
            }),
        }
    }
}

impl fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}
