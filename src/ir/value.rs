use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of a macro or enum constant
///
/// Evaluation prefers the typed forms. A value that could not be resolved keeps
/// the raw expression text, which identifier normalization may rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Unevaluated (or non-u32) expression text
    Raw(String),
    /// Resolved unsigned 32-bit integer
    U32(u32),
    /// Resolved string literal contents
    Str(String),
}

impl Value {
    /// Textual form, typed forms first
    pub fn resolve(&self) -> String {
        match self {
            Value::U32(v) => v.to_string(),
            Value::Str(s) => s.clone(),
            Value::Raw(raw) => raw.clone(),
        }
    }

    /// Returns the raw expression text, if unresolved
    pub fn raw(&self) -> Option<&str> {
        match self {
            Value::Raw(raw) => Some(raw),
            _ => None,
        }
    }

    /// Returns the resolved integer, if any
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other.resolve()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_typed_forms() {
        assert_eq!(Value::U32(19).resolve(), "19");
        assert_eq!(Value::Str("d3d11.dll".into()).resolve(), "d3d11.dll");
        assert_eq!(Value::Raw("FOO + 1".into()).resolve(), "FOO + 1");
    }

    #[test]
    fn test_display_quotes_strings() {
        assert_eq!(Value::Str("a".into()).to_string(), "\"a\"");
        assert_eq!(Value::U32(7).to_string(), "7");
    }
}
