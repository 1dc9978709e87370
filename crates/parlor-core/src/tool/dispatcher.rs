//! Tool call dispatch.
//!
//! `ToolDispatcher::dispatch` never fails: unknown names, schema violations,
//! handler `DomainError`s and handler panics all come back as
//! [`ToolCallResult::Failure`] so the model can read them and react.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use serde_json::{Map, Number, Value};
use tracing::{Instrument, debug, info_span, warn};

use parlor_types::llm::ToolCallRequest;
use parlor_types::tool::{DomainStatus, ParamType, ToolCallResult, ToolFailureKind, ToolParameter};

use super::arguments::{ToolArguments, parse_date};
use super::registry::ToolRegistry;
use super::spec::ToolSpec;

#[derive(Debug, Clone, Copy, Default)]
pub struct ToolDispatcher;

impl ToolDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Resolve, validate and invoke one model-issued tool call.
    pub async fn dispatch(&self, call: &ToolCallRequest, tools: &ToolRegistry) -> ToolCallResult {
        let span = info_span!(
            "gen_ai.tool",
            gen_ai.tool.name = %call.name,
            gen_ai.tool.call.id = %call.id,
        );

        async move {
            let spec = match tools.resolve(&call.name) {
                Ok(spec) => spec,
                Err(e) => {
                    warn!(tool = %call.name, "model requested unknown tool");
                    return ToolCallResult::failure(ToolFailureKind::UnknownTool, e.to_string());
                }
            };

            let args = match Self::validate(&spec, &call.arguments) {
                Ok(args) => args,
                Err(reason) => {
                    warn!(tool = %call.name, %reason, "tool arguments rejected");
                    return ToolCallResult::failure(ToolFailureKind::InvalidArgument, reason);
                }
            };

            let outcome = AssertUnwindSafe(spec.handler().call_boxed(args))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(value)) => {
                    debug!(tool = %call.name, "tool call succeeded");
                    ToolCallResult::Success(value)
                }
                Ok(Err(e)) => {
                    debug!(tool = %call.name, status = %e.status, error = %e.message, "tool returned domain error");
                    ToolCallResult::failure(ToolFailureKind::DomainError(e.status), e.message)
                }
                Err(_) => {
                    warn!(tool = %call.name, "tool handler panicked");
                    ToolCallResult::failure(
                        ToolFailureKind::DomainError(DomainStatus::Internal),
                        format!("tool '{}' failed unexpectedly", call.name),
                    )
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Check `arguments` against the spec's schema and coerce each value to
    /// its declared type.
    ///
    /// `null` counts as absent. Arguments the schema does not declare are
    /// dropped.
    pub fn validate(spec: &ToolSpec, arguments: &Value) -> Result<ToolArguments, String> {
        let empty = Map::new();
        let supplied = match arguments {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => return Err(format!("arguments must be a JSON object, got {}", kind_of(other))),
        };

        let mut validated = Map::new();
        for param in spec.parameters() {
            match supplied.get(&param.name) {
                None | Some(Value::Null) => {
                    if param.required {
                        return Err(format!("missing required argument '{}'", param.name));
                    }
                }
                Some(value) => {
                    let coerced = coerce(param, value)?;
                    validated.insert(param.name.clone(), coerced);
                }
            }
        }
        Ok(ToolArguments::new(validated))
    }
}

fn coerce(param: &ToolParameter, value: &Value) -> Result<Value, String> {
    let name = &param.name;
    let mismatch = || {
        format!(
            "argument '{name}' expected {}, got {}",
            param.param_type,
            kind_of(value)
        )
    };

    match param.param_type {
        ParamType::String => match value {
            Value::String(s) if s.trim().is_empty() && param.required => {
                Err(format!("argument '{name}' must not be empty"))
            }
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(mismatch()),
        },
        ParamType::Integer => match value {
            Value::Number(n) if n.is_i64() => Ok(value.clone()),
            Value::Number(n) if n.is_u64() => Err(format!("argument '{name}' is out of range for an integer")),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                    Ok(Value::Number(Number::from(f as i64)))
                }
                _ => Err(mismatch()),
            },
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|i| Value::Number(Number::from(i)))
                .map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        ParamType::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        ParamType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(mismatch()),
            },
            _ => Err(mismatch()),
        },
        ParamType::Date => match value {
            Value::String(s) => parse_date(s)
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                .ok_or_else(|| format!("argument '{name}' must be a date in YYYY-MM-DD form, got '{s}'")),
            _ => Err(mismatch()),
        },
        ParamType::Object => match value {
            Value::Object(_) => Ok(value.clone()),
            _ => Err(mismatch()),
        },
        ParamType::Array => match value {
            Value::Array(_) => Ok(value.clone()),
            _ => Err(mismatch()),
        },
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
