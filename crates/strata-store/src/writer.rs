//! The single legal mutation path for persisted tokens
//!
//! `TokenWriter` edits exactly one storage unit per operation, persists it
//! atomically (temp file + rename), then reloads the whole store and
//! flushes the resolver cache before returning. Expected failures (bad
//! path shape, unmapped unit, missing leaf) return `false` and log; they
//! never raise.

use crate::store::TokenStore;
use crate::units::StorageUnit;
use std::fs;
use std::io;
use std::path::Path;
use strata_core::TokenPath;

/// Resolution-cache contract. The writer flushes the cache in full exactly
/// once per successful persist-and-reload; there is no partial
/// invalidation.
pub trait InvalidateCache {
    fn invalidate_all(&mut self);
}

/// Writes and deletes tokens in their owning storage unit
#[derive(Debug, Default)]
pub struct TokenWriter;

impl TokenWriter {
    /// Create a new writer
    pub fn new() -> Self {
        Self
    }

    /// Set a token's value (and optionally kind/description), creating the
    /// token and any intermediate namespaces if needed.
    ///
    /// Returns false when the path cannot be mapped to a storage unit or
    /// the unit cannot be read or written. On success the store has been
    /// reloaded and the cache invalidated before this returns, so a
    /// following resolve observes the new state.
    pub fn write(
        &self,
        store: &mut TokenStore,
        cache: &mut dyn InvalidateCache,
        path: &str,
        value: &str,
        kind: Option<&str>,
        description: Option<&str>,
    ) -> bool {
        let (path, unit) = match self.locate(path) {
            Some(found) => found,
            None => return false,
        };

        let file = unit.file_path(store.root());
        let mut doc = match read_document(&file) {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!("write '{}' failed: cannot read unit {}: {}", path, unit.prefix(), e);
                return false;
            }
        };

        let mut table = doc.as_table_mut();
        for segment in path.segments() {
            if table.get(segment).is_none() {
                let mut namespace = toml_edit::Table::new();
                namespace.set_implicit(true);
                table.insert(segment, toml_edit::Item::Table(namespace));
            }
            table = match table.get_mut(segment).and_then(|item| item.as_table_mut()) {
                Some(t) => t,
                None => {
                    log::warn!("write '{}' failed: '{}' is not a namespace", path, segment);
                    return false;
                }
            };
        }

        table.set_implicit(false);
        table.insert("value", value_item(value));
        if let Some(kind) = kind {
            table.insert("kind", toml_edit::value(kind));
        }
        if let Some(description) = description {
            table.insert("description", toml_edit::value(description));
        }

        self.commit(store, cache, &path, &unit, &file, &doc.to_string())
    }

    /// Remove a token from its owning storage unit. Returns false when the
    /// unit file or the token does not exist. Nested tokens under the path
    /// are kept; only the record itself is removed.
    pub fn delete(&self, store: &mut TokenStore, cache: &mut dyn InvalidateCache, path: &str) -> bool {
        let (path, unit) = match self.locate(path) {
            Some(found) => found,
            None => return false,
        };

        let file = unit.file_path(store.root());
        if !file.exists() {
            log::warn!("delete '{}' failed: unit {} has no document", path, unit.prefix());
            return false;
        }
        let mut doc = match read_document(&file) {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!("delete '{}' failed: cannot read unit {}: {}", path, unit.prefix(), e);
                return false;
            }
        };

        if !remove_record(doc.as_table_mut(), &path.segments().collect::<Vec<_>>()) {
            log::warn!("delete '{}' failed: no such token in unit {}", path, unit.prefix());
            return false;
        }

        self.commit(store, cache, &path, &unit, &file, &doc.to_string())
    }

    /// Map a raw path onto its owning unit, logging the rejection reasons
    /// the protocol treats as expected failures
    fn locate(&self, raw: &str) -> Option<(TokenPath, StorageUnit)> {
        let path = match TokenPath::parse(raw) {
            Ok(path) => path,
            Err(e) => {
                log::warn!("write rejected: {}", e);
                return None;
            }
        };
        match StorageUnit::for_path(&path) {
            Some(unit) => Some((path, unit)),
            None => {
                log::warn!("write rejected: no storage unit owns '{}'", path);
                None
            }
        }
    }

    /// Persist, then reload the whole store and flush the cache. The
    /// reload is synchronous: callers observe the new state as soon as
    /// this returns true.
    fn commit(
        &self,
        store: &mut TokenStore,
        cache: &mut dyn InvalidateCache,
        path: &TokenPath,
        unit: &StorageUnit,
        file: &Path,
        content: &str,
    ) -> bool {
        if let Err(e) = persist_atomic(file, content) {
            log::warn!("persist of unit {} failed: {}", unit.prefix(), e);
            return false;
        }
        if let Err(e) = store.load() {
            log::warn!("reload after writing '{}' failed: {}", path, e);
            return false;
        }
        cache.invalidate_all();
        log::debug!("wrote '{}' to unit {}", path, unit.prefix());
        true
    }
}

fn read_document(file: &Path) -> Result<toml_edit::DocumentMut, String> {
    let content = if file.exists() {
        fs::read_to_string(file).map_err(|e| e.to_string())?
    } else {
        String::new()
    };
    content.parse().map_err(|e: toml_edit::TomlError| e.to_string())
}

/// Render a written value: numbers stay numbers, everything else is a
/// string (alias syntax included, verbatim)
fn value_item(value: &str) -> toml_edit::Item {
    if let Ok(i) = value.parse::<i64>() {
        toml_edit::value(i)
    } else if let Ok(f) = value.parse::<f64>() {
        toml_edit::value(f)
    } else {
        toml_edit::value(value)
    }
}

fn persist_atomic(file: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = file.with_extension("toml.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, file)
}

/// Remove the record keys at `segments`, or the whole table when nothing
/// nests under it. Returns false if the path does not lead to a record.
fn remove_record(table: &mut toml_edit::Table, segments: &[&str]) -> bool {
    let (head, rest) = match segments.split_first() {
        Some(split) => split,
        None => return false,
    };

    if rest.is_empty() {
        let leaf = match table.get_mut(head).and_then(|item| item.as_table_mut()) {
            Some(t) => t,
            None => return false,
        };
        if leaf.get("value").is_none() {
            return false;
        }
        let has_children = leaf
            .iter()
            .any(|(key, _)| !matches!(key, "value" | "kind" | "description"));
        if has_children {
            leaf.remove("value");
            leaf.remove("kind");
            leaf.remove("description");
        } else {
            table.remove(head);
        }
        return true;
    }

    match table.get_mut(head).and_then(|item| item.as_table_mut()) {
        Some(child) => remove_record(child, rest),
        None => false,
    }
}
