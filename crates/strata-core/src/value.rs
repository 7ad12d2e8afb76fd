//! Token value forms
//!
//! A token's raw value is classified exactly once, when its storage unit is
//! parsed or written: either a literal, or a reference to another path in
//! the `{path.to.token}` alias syntax. Resolution never re-inspects strings.

use crate::path::TokenPath;
use serde::{Serialize, Serializer};
use std::fmt;

/// Semantic kinds a token may declare. Unknown kinds are a validation
/// warning, not an error, so records store the kind as a plain string and
/// check it against this table.
pub const KNOWN_KINDS: &[&str] = &[
    "color",
    "dimension",
    "font-family",
    "font-weight",
    "duration",
    "cubic-bezier",
    "number",
    "shadow",
    "opacity",
];

/// A terminal literal value: string or number
#[derive(Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TokenValue {
    String(String),
    Number(f64),
}

impl TokenValue {
    /// Get the string form, if this is a string literal
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TokenValue::String(s) => Some(s),
            TokenValue::Number(_) => None,
        }
    }

    /// Get the numeric form, if this is a number literal
    pub fn as_number(&self) -> Option<f64> {
        match self {
            TokenValue::String(_) => None,
            TokenValue::Number(n) => Some(*n),
        }
    }
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenValue::String(s) => write!(f, "{}", s),
            TokenValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
        }
    }
}

impl fmt::Debug for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenValue::String(s) => write!(f, "String({:?})", s),
            TokenValue::Number(n) => write!(f, "Number({})", n),
        }
    }
}

/// A token's raw value: a literal, or an alias reference to another path
#[derive(Clone, PartialEq)]
pub enum RawValue {
    Literal(TokenValue),
    Reference(TokenPath),
}

impl RawValue {
    /// Classify a string value. `{path.to.token}` with a well-formed inner
    /// path becomes a reference; everything else stays a literal, including
    /// strings that merely contain braces.
    pub fn from_string(s: &str) -> Self {
        if let Some(inner) = s
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
        {
            if let Ok(path) = TokenPath::parse(inner) {
                return RawValue::Reference(path);
            }
        }
        RawValue::Literal(TokenValue::String(s.to_string()))
    }

    /// Build a numeric literal
    pub fn from_number(n: f64) -> Self {
        RawValue::Literal(TokenValue::Number(n))
    }

    /// The referenced path, if this is an alias
    pub fn reference(&self) -> Option<&TokenPath> {
        match self {
            RawValue::Literal(_) => None,
            RawValue::Reference(path) => Some(path),
        }
    }

    /// Check if this is an alias reference
    pub fn is_reference(&self) -> bool {
        matches!(self, RawValue::Reference(_))
    }

    /// The value as it appears in a storage unit: literals verbatim,
    /// references in `{path}` syntax
    pub fn to_raw_string(&self) -> String {
        match self {
            RawValue::Literal(v) => v.to_string(),
            RawValue::Reference(path) => format!("{{{}}}", path),
        }
    }
}

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Literal(v) => write!(f, "Literal({})", v),
            RawValue::Reference(path) => write!(f, "Reference({})", path),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_raw_string())
    }
}

impl Serialize for RawValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_raw_string())
    }
}
