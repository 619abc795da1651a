// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value templates for extracting state from message payloads.
//!
//! The adapter treats rendering as an opaque capability behind the
//! [`Render`] trait, so a host with a full templating engine can plug it
//! in. [`ValueTemplate`] is the built-in implementation. It understands
//! literal text mixed with `{{ ... }}` expressions over two variables:
//!
//! - `value`: the raw payload
//! - `value_json`: the payload parsed as JSON, navigable with `.key`,
//!   `['key']` and `[index]`
//!
//! # Examples
//!
//! ```
//! use mqtt_vacuum::template::{Render, ValueTemplate};
//!
//! let template = ValueTemplate::parse("{{ value_json.battery }}").unwrap();
//! assert_eq!(
//!     template.render_with_possible_json_value(r#"{"battery": 61}"#),
//!     Some("61".to_string())
//! );
//!
//! // Payloads that are not JSON produce no value instead of an error
//! assert_eq!(template.render_with_possible_json_value("garbage"), None);
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

/// Renders a message payload into a value.
pub trait Render: Send + Sync + fmt::Debug {
    /// Renders `payload`, exposing it as JSON when it parses as JSON.
    ///
    /// Returns `None` when the template cannot produce a value for this
    /// payload. Callers treat that as "no value", never as an error.
    fn render_with_possible_json_value(&self, payload: &str) -> Option<String>;
}

/// A template failed to parse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TemplateError(String);

impl TemplateError {
    /// Creates an error carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Compiles template source text into a renderer.
///
/// Binding a configuration runs every `*_template` key through the
/// factory, so a host engine plugged in here survives reconfiguration.
pub type RendererFactory =
    Arc<dyn Fn(&str) -> Result<Arc<dyn Render>, TemplateError> + Send + Sync>;

/// Built-in value template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueTemplate {
    source: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Value,
    ValueJson(Vec<PathStep>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathStep {
    Key(String),
    Index(usize),
}

impl ValueTemplate {
    /// Parses a template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] for an unclosed `{{`, a statement block
    /// (`{% ... %}`), or an expression that is not `value` or a
    /// `value_json` path.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        if source.contains("{%") {
            return Err(TemplateError::new("statement blocks are not supported"));
        }

        let mut segments = Vec::new();
        let mut rest = source;
        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| TemplateError::new("unclosed expression"))?;
            segments.push(parse_expression(after[..end].trim())?);
            rest = &after[end + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Returns the template source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the factory that compiles sources into `ValueTemplate`s.
    #[must_use]
    pub fn factory() -> RendererFactory {
        Arc::new(|source: &str| -> Result<Arc<dyn Render>, TemplateError> {
            let template: Arc<dyn Render> = Arc::new(Self::parse(source)?);
            Ok(template)
        })
    }
}

impl Render for ValueTemplate {
    fn render_with_possible_json_value(&self, payload: &str) -> Option<String> {
        let mut json: Option<Option<Value>> = None;
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Value => out.push_str(payload),
                Segment::ValueJson(path) => {
                    let root = json
                        .get_or_insert_with(|| serde_json::from_str(payload).ok())
                        .as_ref()?;
                    out.push_str(&render_json(lookup(root, path)?));
                }
            }
        }

        Some(out)
    }
}

impl fmt::Display for ValueTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_expression(expr: &str) -> Result<Segment, TemplateError> {
    if expr == "value" {
        return Ok(Segment::Value);
    }
    let Some(mut rest) = expr.strip_prefix("value_json") else {
        return Err(TemplateError::new(format!(
            "unsupported expression `{expr}`, expected `value` or `value_json`"
        )));
    };

    let mut path = Vec::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        if let Some(after) = rest.strip_prefix('.') {
            let len = after
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            if len == 0 {
                return Err(TemplateError::new(format!("missing key after `.` in `{expr}`")));
            }
            path.push(PathStep::Key(after[..len].to_string()));
            rest = &after[len..];
        } else if let Some(after) = rest.strip_prefix('[') {
            let end = after
                .find(']')
                .ok_or_else(|| TemplateError::new(format!("unclosed `[` in `{expr}`")))?;
            path.push(parse_subscript(after[..end].trim(), expr)?);
            rest = &after[end + 1..];
        } else {
            return Err(TemplateError::new(format!(
                "unexpected `{rest}` in `{expr}`"
            )));
        }
    }

    Ok(Segment::ValueJson(path))
}

fn parse_subscript(inner: &str, expr: &str) -> Result<PathStep, TemplateError> {
    for quote in ['\'', '"'] {
        if let Some(key) = inner
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return Ok(PathStep::Key(key.to_string()));
        }
    }
    inner
        .parse::<usize>()
        .map(PathStep::Index)
        .map_err(|_| TemplateError::new(format!("invalid subscript `[{inner}]` in `{expr}`")))
}

fn lookup<'a>(root: &'a Value, path: &[PathStep]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, step| match step {
        PathStep::Key(key) => node.get(key.as_str()),
        PathStep::Index(index) => node.get(*index),
    })
}

/// Formats a JSON value the way templated text shows it.
fn render_json(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(template: &str, payload: &str) -> Option<String> {
        ValueTemplate::parse(template)
            .unwrap()
            .render_with_possible_json_value(payload)
    }

    #[test]
    fn raw_value() {
        assert_eq!(render("{{ value }}", "42"), Some("42".to_string()));
        assert_eq!(render("{{value}}", "not json"), Some("not json".to_string()));
    }

    #[test]
    fn json_attribute_path() {
        let payload = r#"{"state": {"battery": 88, "docked": true}}"#;
        assert_eq!(
            render("{{ value_json.state.battery }}", payload),
            Some("88".to_string())
        );
        assert_eq!(
            render("{{ value_json.state.docked }}", payload),
            Some("True".to_string())
        );
    }

    #[test]
    fn json_subscripts() {
        let payload = r#"{"fan speed": "max", "errors": ["E1", "E2"]}"#;
        assert_eq!(
            render("{{ value_json['fan speed'] }}", payload),
            Some("max".to_string())
        );
        assert_eq!(
            render(r#"{{ value_json["errors"][1] }}"#, payload),
            Some("E2".to_string())
        );
    }

    #[test]
    fn literal_text_around_expressions() {
        assert_eq!(
            render("fan: {{ value_json.fan }}!", r#"{"fan": "low"}"#),
            Some("fan: low!".to_string())
        );
        assert_eq!(render("constant", "anything"), Some("constant".to_string()));
    }

    #[test]
    fn json_scalars_and_containers() {
        assert_eq!(render("{{ value_json }}", "null"), Some("None".to_string()));
        assert_eq!(render("{{ value_json }}", "3.5"), Some("3.5".to_string()));
        assert_eq!(
            render("{{ value_json.list }}", r#"{"list":[1,2]}"#),
            Some("[1,2]".to_string())
        );
    }

    #[test]
    fn non_json_payload_yields_no_value() {
        assert_eq!(render("{{ value_json.battery }}", "{broken"), None);
    }

    #[test]
    fn missing_key_yields_no_value() {
        assert_eq!(render("{{ value_json.battery }}", r#"{"other": 1}"#), None);
        assert_eq!(render("{{ value_json[3] }}", "[1, 2]"), None);
    }

    #[test]
    fn parse_errors() {
        assert!(ValueTemplate::parse("{{ value_json.battery").is_err());
        assert!(ValueTemplate::parse("{% if value %}x{% endif %}").is_err());
        assert!(ValueTemplate::parse("{{ states('sensor.x') }}").is_err());
        assert!(ValueTemplate::parse("{{ value_json. }}").is_err());
        assert!(ValueTemplate::parse("{{ value_json[abc] }}").is_err());
        assert!(ValueTemplate::parse("{{ value.x }}").is_err());
    }

    #[test]
    fn factory_compiles_value_templates() {
        let factory = ValueTemplate::factory();
        let renderer = factory("{{ value_json.fan }}").unwrap();
        assert_eq!(
            renderer.render_with_possible_json_value(r#"{"fan": "max"}"#),
            Some("max".to_string())
        );
        assert!(factory("{{ value_json.fan").is_err());
    }

    #[test]
    fn source_is_preserved() {
        let template = ValueTemplate::parse("{{ value_json.x }}").unwrap();
        assert_eq!(template.source(), "{{ value_json.x }}");
        assert_eq!(template.to_string(), "{{ value_json.x }}");
    }
}
