//! Reply templates with `<key>` placeholders.
//!
//! A template is free text in which every `<key>` is replaced by the value
//! registered under `key` in a [`ResponseInfo`]. A placeholder with no
//! registered value is an error rather than being left in the reply.

use std::collections::BTreeMap;

use thiserror::Error;

pub mod money;

pub use money::{Money, MoneyError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown key <{key}> in template; valid keys are: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("template uses invalid keys: {found}; valid keys are:\n{expected}")]
    UnexpectedKeys { found: String, expected: String },

    #[error("illegal character in key {0:?}")]
    IllegalKey(String),
}

/// A value substituted into a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatValue {
    Text(String),
    Money(Money),
}

impl FormatValue {
    fn render(&self) -> String {
        match self {
            FormatValue::Text(s) => s.clone(),
            FormatValue::Money(m) => m.to_string(),
        }
    }
}

/// The values available to a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseInfo {
    values: BTreeMap<String, FormatValue>,
}

impl ResponseInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values
            .insert(key.into(), FormatValue::Text(value.into()));
        self
    }

    pub fn with_money(mut self, key: impl Into<String>, value: Money) -> Self {
        self.values.insert(key.into(), FormatValue::Money(value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&FormatValue> {
        self.values.get(key)
    }

    fn keys(&self) -> String {
        self.values.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// A key a template may use, with a description for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedKey {
    pub key: String,
    pub description: String,
}

impl ExpectedKey {
    /// Fails if `key` contains `<` or `>`.
    pub fn new(key: impl Into<String>, description: impl Into<String>) -> Result<Self, TemplateError> {
        let key = key.into();
        if key.contains(['<', '>']) {
            return Err(TemplateError::IllegalKey(key));
        }
        Ok(ExpectedKey {
            key,
            description: description.into(),
        })
    }
}

/// Splits a template into literal text and placeholder keys.
enum Piece<'a> {
    Literal(&'a str),
    Key(&'a str),
}

fn pieces(template: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('<') {
        let Some(len) = rest[open..].find('>') else {
            break;
        };
        if open > 0 {
            pieces.push(Piece::Literal(&rest[..open]));
        }
        pieces.push(Piece::Key(&rest[open + 1..open + len]));
        rest = &rest[open + len + 1..];
    }
    if !rest.is_empty() {
        pieces.push(Piece::Literal(rest));
    }
    pieces
}

/// Substitutes every `<key>` in `template` from `info`.
pub fn render(template: &str, info: &ResponseInfo) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    for piece in pieces(template) {
        match piece {
            Piece::Literal(text) => out.push_str(text),
            Piece::Key(key) => {
                let value = info.get(key).ok_or_else(|| TemplateError::UnknownKey {
                    key: key.to_string(),
                    valid: info.keys(),
                })?;
                out.push_str(&value.render());
            }
        }
    }
    Ok(out)
}

/// Checks that `template` only uses `expected` keys.
pub fn verify(template: &str, expected: &[ExpectedKey]) -> Result<(), TemplateError> {
    let unexpected: Vec<&str> = pieces(template)
        .into_iter()
        .filter_map(|piece| match piece {
            Piece::Key(key) if !expected.iter().any(|e| e.key == key) => Some(key),
            _ => None,
        })
        .collect();
    if unexpected.is_empty() {
        return Ok(());
    }
    let expected = expected
        .iter()
        .map(|e| format!("  '{}': {}", e.key, e.description))
        .collect::<Vec<_>>()
        .join("\n");
    Err(TemplateError::UnexpectedKeys {
        found: unexpected.join(", "),
        expected,
    })
}
