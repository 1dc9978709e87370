//! Validated tool arguments.
//!
//! The dispatcher coerces model-supplied values against the tool's schema
//! before a handler ever sees them, so the typed accessors below only fail
//! when a handler asks for a parameter it never declared.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use parlor_types::tool::DomainError;

/// Argument map handed to a [`ToolHandler`](super::ToolHandler).
///
/// Holds only declared parameters. Optional parameters the model omitted (or
/// sent as `null`) are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    values: Map<String, Value>,
}

impl ToolArguments {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn str(&self, name: &str) -> Result<&str, DomainError> {
        self.opt_str(name).ok_or_else(|| missing(name, "string"))
    }

    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn i64(&self, name: &str) -> Result<i64, DomainError> {
        self.opt_i64(name).ok_or_else(|| missing(name, "integer"))
    }

    pub fn opt_i64(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    pub fn bool(&self, name: &str) -> Result<bool, DomainError> {
        self.opt_bool(name).ok_or_else(|| missing(name, "boolean"))
    }

    pub fn opt_bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(Value::as_bool)
    }

    pub fn date(&self, name: &str) -> Result<NaiveDate, DomainError> {
        match self.opt_date(name)? {
            Some(date) => Ok(date),
            None => Err(missing(name, "date")),
        }
    }

    /// Optional date. Errors only if present but not `YYYY-MM-DD`.
    pub fn opt_date(&self, name: &str) -> Result<Option<NaiveDate>, DomainError> {
        match self.opt_str(name) {
            None => Ok(None),
            Some(raw) => parse_date(raw)
                .map(Some)
                .ok_or_else(|| DomainError::bad_input(format!("'{name}' is not a valid date: {raw}"))),
        }
    }
}

impl From<Map<String, Value>> for ToolArguments {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}

/// Parse an ISO calendar date.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn missing(name: &str, expected: &str) -> DomainError {
    DomainError::bad_input(format!("missing {expected} argument '{name}'"))
}
