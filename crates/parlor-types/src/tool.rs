//! Tool schema and tool-call result types.
//!
//! A tool's parameters are a tagged schema (name, declared type, required
//! flag). Model-supplied arguments are validated against it at the dispatch
//! boundary, never bound implicitly.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use thiserror::Error;

/// Declared type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    /// Calendar date in ISO `YYYY-MM-DD` form.
    Date,
    Object,
    Array,
}

impl ParamType {
    /// JSON Schema fragment for this type.
    pub fn json_schema(&self) -> Value {
        match self {
            ParamType::String => json!({ "type": "string" }),
            ParamType::Integer => json!({ "type": "integer" }),
            ParamType::Number => json!({ "type": "number" }),
            ParamType::Boolean => json!({ "type": "boolean" }),
            ParamType::Date => json!({ "type": "string", "format": "date" }),
            ParamType::Object => json!({ "type": "object" }),
            ParamType::Array => json!({ "type": "array" }),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Date => "date",
            ParamType::Object => "object",
            ParamType::Array => "array",
        };
        f.write_str(s)
    }
}

/// One entry in a tool's ordered parameter schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub description: String,
}

impl ToolParameter {
    pub fn required(name: impl Into<String>, param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(name: impl Into<String>, param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: false,
            description: description.into(),
        }
    }
}

/// Caller-facing status category of a domain failure.
///
/// The boundary layer translates these (e.g. into HTTP statuses); inside a
/// turn they are only data handed back to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    NotFound,
    BadInput,
    Conflict,
    Unavailable,
    Internal,
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DomainStatus::NotFound => "not_found",
            DomainStatus::BadInput => "bad_input",
            DomainStatus::Conflict => "conflict",
            DomainStatus::Unavailable => "unavailable",
            DomainStatus::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Business failure raised by a tool handler (e.g. "booking not found").
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {message}")]
pub struct DomainError {
    pub status: DomainStatus,
    pub message: String,
}

impl DomainError {
    pub fn new(status: DomainStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(DomainStatus::NotFound, message)
    }

    pub fn bad_input(message: impl Into<String>) -> Self {
        Self::new(DomainStatus::BadInput, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(DomainStatus::Conflict, message)
    }
}

/// Why a tool call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum ToolFailureKind {
    UnknownTool,
    InvalidArgument,
    DomainError(DomainStatus),
}

/// Outcome of one dispatched tool call, fed back to the model as a
/// tool-role message.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallResult {
    Success(Value),
    Failure { kind: ToolFailureKind, message: String },
}

impl ToolCallResult {
    pub fn failure(kind: ToolFailureKind, message: impl Into<String>) -> Self {
        ToolCallResult::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolCallResult::Success(_))
    }

    /// Failure kind, if this is a failure.
    pub fn failure_kind(&self) -> Option<ToolFailureKind> {
        match self {
            ToolCallResult::Success(_) => None,
            ToolCallResult::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Structured payload the model reads back.
    ///
    /// Failures render as `{"error": {"kind": .., "status": .., "message": ..}}`.
    pub fn to_payload(&self) -> Value {
        match self {
            ToolCallResult::Success(value) => value.clone(),
            ToolCallResult::Failure { kind, message } => {
                let mut error = match serde_json::to_value(kind) {
                    Ok(Value::Object(map)) => map,
                    _ => serde_json::Map::new(),
                };
                error.insert("message".to_string(), Value::String(message.clone()));
                json!({ "error": Value::Object(error) })
            }
        }
    }

    /// Payload serialized as the text content of a tool-role message.
    pub fn to_content(&self) -> String {
        match self.to_payload() {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }
}
