//! System-prompt templates with named placeholders.
//!
//! Syntax: `{name}` is a placeholder, `{{` and `}}` are literal braces.
//! Templates are parsed once when the agent is built; per-turn resolution is
//! a straight walk over the parsed segments.

use std::collections::HashMap;

use parlor_types::agent::PlaceholderSpec;
use parlor_types::error::TemplateError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Placeholder(String),
}

/// A parsed system-prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
    placeholders: Vec<PlaceholderSpec>,
}

impl PromptTemplate {
    /// Parse `source` and attach placeholder declarations.
    ///
    /// Placeholders used in the text but not declared are treated as
    /// required. Declarations are kept even if the text never uses them.
    pub fn new(source: impl Into<String>, declared: Vec<PlaceholderSpec>) -> Result<Self, TemplateError> {
        let source = source.into();
        let segments = parse(&source)?;

        let mut placeholders = declared;
        for segment in &segments {
            if let Segment::Placeholder(name) = segment {
                if !placeholders.iter().any(|p| &p.name == name) {
                    placeholders.push(PlaceholderSpec::required(name.clone()));
                }
            }
        }

        Ok(Self {
            source,
            segments,
            placeholders,
        })
    }

    /// A template with no placeholders at all.
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            segments: vec![Segment::Text(text.clone())],
            source: text,
            placeholders: Vec::new(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn placeholders(&self) -> &[PlaceholderSpec] {
        &self.placeholders
    }

    /// Substitute placeholders from `params`, falling back to declared
    /// defaults. Parameters that name no placeholder are ignored.
    pub fn resolve(&self, params: &HashMap<String, String>) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(name) => out.push_str(self.value_for(name, params)?),
            }
        }
        Ok(out)
    }

    fn value_for<'a>(
        &'a self,
        name: &str,
        params: &'a HashMap<String, String>,
    ) -> Result<&'a str, TemplateError> {
        if let Some(value) = params.get(name) {
            return Ok(value.as_str());
        }
        self.placeholders
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.default.as_deref())
            .ok_or_else(|| TemplateError::MissingPlaceholder(name.to_string()))
    }
}

fn parse(source: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut chars = source.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                text.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                text.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    return Err(malformed(pos, "unclosed '{'"));
                }
                let name = name.trim();
                if name.is_empty() {
                    return Err(malformed(pos, "empty placeholder name"));
                }
                if !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
                    return Err(malformed(pos, &format!("invalid placeholder name '{name}'")));
                }
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Placeholder(name.to_string()));
            }
            '}' => return Err(malformed(pos, "unmatched '}'")),
            other => text.push(other),
        }
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

fn malformed(position: usize, reason: &str) -> TemplateError {
    TemplateError::Malformed {
        position,
        reason: reason.to_string(),
    }
}
