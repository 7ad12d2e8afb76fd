//! Token unit document format
//!
//! A storage unit is a TOML document of nested tables, addressed by full
//! token path from the tree root. A table carrying a `value` key is a
//! token record; its other table entries, if any, are child namespaces:
//!
//! ```toml
//! [base.color.blue.500]
//! value = "#2563eb"
//! kind = "color"
//!
//! [semantic.color.brand.primary]
//! value = "{base.color.blue.500}"
//! ```
//!
//! Full-path addressing means a unit *can* declare a leaf that another unit
//! also declares; the store's deterministic merge order decides the winner
//! and reports the override.

use strata_core::{RawValue, Result, StrataError, TokenPath};
use std::collections::BTreeMap;

/// A single token's stored payload
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRecord {
    pub raw: RawValue,
    pub kind: Option<String>,
    pub description: Option<String>,
}

/// One node of the merged token tree: an optional leaf record plus sorted
/// child namespaces. Namespace-only nodes carry no record.
#[derive(Debug, Clone, Default)]
pub struct TokenNode {
    pub record: Option<TokenRecord>,
    pub children: BTreeMap<String, TokenNode>,
}

impl TokenNode {
    /// Create an empty namespace node
    pub fn new() -> Self {
        Self::default()
    }

    /// Descend to the node at the given segments, if present
    pub fn get<'a>(&self, mut segments: impl Iterator<Item = &'a str>) -> Option<&TokenNode> {
        match segments.next() {
            None => Some(self),
            Some(seg) => self.children.get(seg)?.get(segments),
        }
    }

    /// Walk to the node at the given segments, creating namespace nodes
    /// along the way
    pub fn get_or_create<'a>(&mut self, segments: impl Iterator<Item = &'a str>) -> &mut TokenNode {
        let mut node = self;
        for seg in segments {
            node = node.children.entry(seg.to_string()).or_default();
        }
        node
    }

    /// Count nodes that carry a record (tokens, not namespaces)
    pub fn count_leaves(&self) -> usize {
        let own = usize::from(self.record.is_some());
        own + self.children.values().map(TokenNode::count_leaves).sum::<usize>()
    }

    /// Collect every token under this node, depth-first. `prefix` is the
    /// path of this node itself ("" for the tree root).
    pub fn collect_tokens<'a>(&'a self, prefix: &str, out: &mut Vec<(TokenPath, &'a TokenRecord)>) {
        if let Some(record) = &self.record {
            if let Ok(path) = TokenPath::parse(prefix) {
                out.push((path, record));
            }
        }
        for (name, child) in &self.children {
            let child_prefix = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}.{}", prefix, name)
            };
            child.collect_tokens(&child_prefix, out);
        }
    }
}

/// Parse a unit document into a tree rooted at the namespace root.
pub fn parse_unit(content: &str) -> Result<TokenNode> {
    let table = content
        .parse::<toml::Table>()
        .map_err(|e| StrataError::TomlParseError(e.to_string()))?;
    let mut root = TokenNode::new();
    build_node(&table, &mut root)?;
    Ok(root)
}

fn build_node(table: &toml::Table, node: &mut TokenNode) -> Result<()> {
    if let Some(value) = table.get("value") {
        node.record = Some(TokenRecord {
            raw: parse_raw_value(value)?,
            kind: table.get("kind").and_then(|v| v.as_str()).map(String::from),
            description: table
                .get("description")
                .and_then(|v| v.as_str())
                .map(String::from),
        });
    }

    for (key, value) in table {
        if matches!(key.as_str(), "value" | "kind" | "description") {
            continue;
        }
        match value {
            toml::Value::Table(child_table) => {
                let child = node.children.entry(key.clone()).or_default();
                build_node(child_table, child)?;
            }
            other => {
                return Err(StrataError::ParseError(format!(
                    "unexpected non-table entry '{}' = {}",
                    key, other
                )));
            }
        }
    }

    Ok(())
}

fn parse_raw_value(value: &toml::Value) -> Result<RawValue> {
    match value {
        toml::Value::String(s) => Ok(RawValue::from_string(s)),
        toml::Value::Integer(i) => Ok(RawValue::from_number(*i as f64)),
        toml::Value::Float(f) => Ok(RawValue::from_number(*f)),
        other => Err(StrataError::ParseError(format!(
            "token value must be a string or number, got {}",
            other
        ))),
    }
}
