//! Alias-chain resolution
//!
//! Resolution is best-effort and never raises: a cycle or a dangling hop
//! stops the walk, keeps the token's original raw string as the resolved
//! value, and attaches a diagnostic for the validator to report.

use crate::cache::ResolveCache;
use std::collections::HashSet;
use std::sync::Arc;
use strata_core::{RawValue, TokenPath, TokenValue};
use strata_store::{InvalidateCache, TokenRecord, TokenStore};

/// Why a token could not be resolved to a terminal literal
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveDiagnostic {
    /// The alias chain revisited a path. `chain` is the full walk from the
    /// starting token to the repeated hop.
    Cycle { chain: Vec<TokenPath> },
    /// The alias chain reached a path with no token behind it
    Dangling { target: TokenPath },
}

/// A token with its alias chain followed to a terminal value
#[derive(Debug, Clone)]
pub struct ResolvedToken {
    pub path: TokenPath,
    /// The raw value exactly as stored
    pub raw: RawValue,
    /// The terminal literal, or the original raw string when resolution
    /// stopped on a cycle or dangling reference
    pub value: TokenValue,
    /// Every alias hop visited, in order; empty for literals
    pub reference_chain: Vec<TokenPath>,
    pub kind: Option<String>,
    pub description: Option<String>,
    pub diagnostic: Option<ResolveDiagnostic>,
}

/// Follows alias chains and memoizes results per (path, mode).
///
/// The resolver borrows the store per call; it owns only its cache. The
/// writer flushes the cache through `InvalidateCache` after every
/// successful write, so no stale resolution is observable once a write
/// returns.
#[derive(Debug, Default)]
pub struct TokenResolver {
    cache: ResolveCache,
}

impl TokenResolver {
    /// Create a resolver with an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a path. `None` means the path names no token — callers
    /// decide whether that is fatal. With `resolve_aliases` false the
    /// value is the raw entry verbatim and the chain is empty.
    pub fn resolve(
        &mut self,
        store: &TokenStore,
        path: &str,
        resolve_aliases: bool,
    ) -> Option<Arc<ResolvedToken>> {
        if let Some(hit) = self.cache.get(path, resolve_aliases) {
            return Some(hit);
        }

        let parsed = TokenPath::parse(path).ok()?;
        let record = store.get(&parsed)?;

        let resolved = if resolve_aliases {
            follow_chain(store, &parsed, record)
        } else {
            ResolvedToken {
                path: parsed,
                raw: record.raw.clone(),
                value: raw_as_value(&record.raw),
                reference_chain: Vec::new(),
                kind: record.kind.clone(),
                description: record.description.clone(),
                diagnostic: None,
            }
        };

        let resolved = Arc::new(resolved);
        self.cache.insert(path, resolve_aliases, resolved.clone());
        Some(resolved)
    }

    /// Resolve every token at or under `prefix`, depth-first
    pub fn resolve_by_prefix(&mut self, store: &TokenStore, prefix: &str) -> Vec<Arc<ResolvedToken>> {
        let prefix = match TokenPath::parse(prefix) {
            Ok(prefix) => prefix,
            Err(_) => return Vec::new(),
        };
        let paths: Vec<String> = store
            .tokens_under(&prefix)
            .into_iter()
            .map(|(path, _)| path.as_str().to_string())
            .collect();
        paths
            .iter()
            .filter_map(|path| self.resolve(store, path, true))
            .collect()
    }

    /// Resolve every token whose own declaration carries the given kind
    pub fn resolve_by_kind(&mut self, store: &TokenStore, kind: &str) -> Vec<Arc<ResolvedToken>> {
        let paths: Vec<String> = store
            .tokens()
            .into_iter()
            .filter(|(_, record)| record.kind.as_deref() == Some(kind))
            .map(|(path, _)| path.as_str().to_string())
            .collect();
        paths
            .iter()
            .filter_map(|path| self.resolve(store, path, true))
            .collect()
    }

    /// Drop every cached resolution
    pub fn invalidate(&mut self) {
        self.cache.invalidate_all();
    }

    /// Number of memoized resolutions (observability for tests and tools)
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

impl InvalidateCache for TokenResolver {
    fn invalidate_all(&mut self) {
        self.invalidate();
    }
}

fn raw_as_value(raw: &RawValue) -> TokenValue {
    match raw {
        RawValue::Literal(value) => value.clone(),
        RawValue::Reference(_) => TokenValue::String(raw.to_raw_string()),
    }
}

fn follow_chain(store: &TokenStore, start: &TokenPath, record: &TokenRecord) -> ResolvedToken {
    let mut chain: Vec<TokenPath> = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(start.as_str());

    let mut current = record;
    loop {
        let target = match &current.raw {
            RawValue::Literal(value) => {
                return resolved(start, record, value.clone(), chain, None);
            }
            RawValue::Reference(target) => target,
        };

        if visited.contains(target.as_str()) {
            let mut full = Vec::with_capacity(chain.len() + 2);
            full.push(start.clone());
            full.extend(chain.iter().cloned());
            full.push(target.clone());
            log::warn!(
                "circular reference resolving '{}': {}",
                start,
                format_chain(&full)
            );
            let diagnostic = ResolveDiagnostic::Cycle { chain: full };
            return resolved(start, record, raw_as_value(&record.raw), chain, Some(diagnostic));
        }

        match store.get(target) {
            Some(next) => {
                visited.insert(target.as_str());
                chain.push(target.clone());
                current = next;
            }
            None => {
                log::warn!("dangling reference resolving '{}': '{}' does not exist", start, target);
                let diagnostic = ResolveDiagnostic::Dangling {
                    target: target.clone(),
                };
                return resolved(start, record, raw_as_value(&record.raw), chain, Some(diagnostic));
            }
        }
    }
}

fn resolved(
    path: &TokenPath,
    record: &TokenRecord,
    value: TokenValue,
    chain: Vec<TokenPath>,
    diagnostic: Option<ResolveDiagnostic>,
) -> ResolvedToken {
    ResolvedToken {
        path: path.clone(),
        raw: record.raw.clone(),
        value,
        reference_chain: chain,
        kind: record.kind.clone(),
        description: record.description.clone(),
        diagnostic,
    }
}

fn format_chain(chain: &[TokenPath]) -> String {
    chain
        .iter()
        .map(TokenPath::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn fixture_store() -> (TokenStore, PathBuf) {
        let root = std::env::temp_dir().join(format!("strata_test_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(root.join("base")).unwrap();
        fs::write(
            root.join("base/color.toml"),
            r##"
[base.color.red]
value = "#dc2626"
kind = "color"

[base.color.crimson]
value = "{base.color.red}"

[base.color.scarlet]
value = "{base.color.crimson}"
kind = "color"

[base.color.loop.a]
value = "{base.color.loop.b}"

[base.color.loop.b]
value = "{base.color.loop.a}"

[base.color.ghost]
value = "{base.color.missing}"
"##,
        )
        .unwrap();
        fs::write(
            root.join("base/dimension.toml"),
            "[base.dimension.spacing.md]\nvalue = \"16px\"\nkind = \"dimension\"\n",
        )
        .unwrap();
        let (store, _) = TokenStore::open(&root).unwrap();
        (store, root)
    }

    #[test]
    fn test_literal_resolves_to_itself() {
        let (store, root) = fixture_store();
        let mut resolver = TokenResolver::new();

        let token = resolver.resolve(&store, "base.color.red", true).unwrap();
        assert_eq!(token.value.to_string(), "#dc2626");
        assert!(token.reference_chain.is_empty());
        assert!(token.diagnostic.is_none());

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_alias_chain() {
        let (store, root) = fixture_store();
        let mut resolver = TokenResolver::new();

        let token = resolver.resolve(&store, "base.color.scarlet", true).unwrap();
        assert_eq!(token.value.to_string(), "#dc2626");
        let chain: Vec<&str> = token.reference_chain.iter().map(TokenPath::as_str).collect();
        assert_eq!(chain, vec!["base.color.crimson", "base.color.red"]);

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_raw_mode_keeps_alias_syntax() {
        let (store, root) = fixture_store();
        let mut resolver = TokenResolver::new();

        let token = resolver.resolve(&store, "base.color.crimson", false).unwrap();
        assert_eq!(token.value.to_string(), "{base.color.red}");
        assert!(token.reference_chain.is_empty());

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_cycle_terminates_with_diagnostic() {
        let (store, root) = fixture_store();
        let mut resolver = TokenResolver::new();

        let token = resolver.resolve(&store, "base.color.loop.a", true).unwrap();
        // The raw alias string comes back untouched
        assert_eq!(token.value.to_string(), "{base.color.loop.b}");
        match token.diagnostic.as_ref().unwrap() {
            ResolveDiagnostic::Cycle { chain } => {
                let names: Vec<&str> = chain.iter().map(TokenPath::as_str).collect();
                assert!(names.contains(&"base.color.loop.a"));
                assert!(names.contains(&"base.color.loop.b"));
            }
            other => panic!("expected cycle diagnostic, got {:?}", other),
        }

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_dangling_reference_keeps_raw_value() {
        let (store, root) = fixture_store();
        let mut resolver = TokenResolver::new();

        let token = resolver.resolve(&store, "base.color.ghost", true).unwrap();
        assert_eq!(token.value.to_string(), "{base.color.missing}");
        assert_eq!(
            token.diagnostic,
            Some(ResolveDiagnostic::Dangling {
                target: TokenPath::parse("base.color.missing").unwrap()
            })
        );

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_missing_path_is_not_an_error() {
        let (store, root) = fixture_store();
        let mut resolver = TokenResolver::new();
        assert!(resolver.resolve(&store, "base.color.nope", true).is_none());
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_cache_hit_returns_same_allocation() {
        let (store, root) = fixture_store();
        let mut resolver = TokenResolver::new();

        let first = resolver.resolve(&store, "base.color.red", true).unwrap();
        let second = resolver.resolve(&store, "base.color.red", true).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // Modes cache independently
        let raw = resolver.resolve(&store, "base.color.red", false).unwrap();
        assert!(!Arc::ptr_eq(&first, &raw));

        resolver.invalidate();
        let third = resolver.resolve(&store, "base.color.red", true).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(first.value.to_string(), third.value.to_string());

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_unrelated_write_leaves_resolved_value_unchanged() {
        let (mut store, root) = fixture_store();
        let mut resolver = TokenResolver::new();

        let before = resolver.resolve(&store, "base.color.red", true).unwrap();

        let writer = strata_store::TokenWriter::new();
        assert!(writer.write(&mut store, &mut resolver, "base.dimension.gap", "8px", None, None));

        // The flush is whole-cache, so the allocation is new, but the
        // untouched token resolves to the same value
        let after = resolver.resolve(&store, "base.color.red", true).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.value.to_string(), after.value.to_string());
        assert_eq!(after.value.to_string(), "#dc2626");

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_resolve_by_prefix() {
        let (store, root) = fixture_store();
        let mut resolver = TokenResolver::new();

        let reds = resolver.resolve_by_prefix(&store, "base.color.loop");
        assert_eq!(reds.len(), 2);

        let all_colors = resolver.resolve_by_prefix(&store, "base.color");
        assert_eq!(all_colors.len(), 6);

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_resolve_by_kind() {
        let (store, root) = fixture_store();
        let mut resolver = TokenResolver::new();

        let colors = resolver.resolve_by_kind(&store, "color");
        let paths: Vec<&str> = colors.iter().map(|t| t.path.as_str()).collect();
        // Only tokens declaring the kind themselves; crimson declares none
        assert_eq!(paths, vec!["base.color.red", "base.color.scarlet"]);

        let dims = resolver.resolve_by_kind(&store, "dimension");
        assert_eq!(dims.len(), 1);
        assert_eq!(dims[0].value.to_string(), "16px");

        fs::remove_dir_all(&root).ok();
    }
}
