//! Dot-separated token paths

use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A dot-separated token path, e.g. `base.color.blue.500`.
///
/// A path is the stable identity of a token within the merged tree. The
/// first segment names the tier and the second the category; together they
/// address the storage unit that owns the token.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenPath(String);

impl TokenPath {
    /// Parse a path, rejecting empty paths and empty segments
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(StrataError::InvalidPath("empty path".to_string()));
        }
        if s.split('.').any(|seg| seg.is_empty()) {
            return Err(StrataError::InvalidPath(format!(
                "empty segment in '{}'",
                s
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the path as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path's segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// First segment: the storage tier
    pub fn tier(&self) -> &str {
        self.segments().next().unwrap_or("")
    }

    /// Second segment: the storage category, if the path is deep enough
    pub fn category(&self) -> Option<&str> {
        self.segments().nth(1)
    }

    /// Check if this path is equal to or nested under `prefix`
    pub fn starts_with(&self, prefix: &TokenPath) -> bool {
        self.0 == prefix.0 || self.0.starts_with(&format!("{}.", prefix.0))
    }
}

impl fmt::Debug for TokenPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenPath({})", self.0)
    }
}

impl fmt::Display for TokenPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
