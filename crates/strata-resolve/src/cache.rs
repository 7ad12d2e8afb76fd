//! Resolution memoization

use crate::resolver::ResolvedToken;
use std::collections::HashMap;
use std::sync::Arc;

/// Cache of resolution results keyed by (path, resolve-aliases mode).
///
/// Entries are shared `Arc`s: a cache hit returns the identical allocation,
/// so callers can verify hits by pointer equality. Invalidation is always
/// whole-cache — the store reloads as a whole, so the cache flushes as a
/// whole.
#[derive(Debug, Default)]
pub struct ResolveCache {
    entries: HashMap<(String, bool), Arc<ResolvedToken>>,
}

impl ResolveCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached resolution
    pub fn get(&self, path: &str, resolve_aliases: bool) -> Option<Arc<ResolvedToken>> {
        self.entries
            .get(&(path.to_string(), resolve_aliases))
            .cloned()
    }

    /// Memoize a resolution
    pub fn insert(&mut self, path: &str, resolve_aliases: bool, resolved: Arc<ResolvedToken>) {
        self.entries
            .insert((path.to_string(), resolve_aliases), resolved);
    }

    /// Drop every entry
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    /// Number of memoized resolutions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
