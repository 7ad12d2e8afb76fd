//! The merged in-memory token tree

use crate::format::{parse_unit, TokenNode, TokenRecord};
use crate::units::StorageUnit;
use std::fs;
use std::path::{Path, PathBuf};
use strata_core::{ContentHash, Result, TokenPath};

/// Summary of one `load()` pass over the storage units
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Units found on disk, in load order
    pub units_loaded: Vec<StorageUnit>,
    /// Tokens in the merged tree
    pub leaf_count: usize,
    /// Leaf paths that were defined by more than one unit. The later unit
    /// won; load order is deterministic, so these are documented overrides
    /// rather than silent ones.
    pub overrides: Vec<TokenPath>,
}

impl LoadReport {
    /// Human-readable one-line summary
    pub fn summary(&self) -> String {
        format!(
            "{} unit(s), {} token(s), {} override(s)",
            self.units_loaded.len(),
            self.leaf_count,
            self.overrides.len()
        )
    }
}

/// Owner of the merged token tree.
///
/// The store only reads; all mutation goes through `TokenWriter`, which
/// persists a unit and then calls `load()` again. Reload is always
/// whole-tree, never partial.
pub struct TokenStore {
    root: PathBuf,
    tree: TokenNode,
}

impl TokenStore {
    /// Create a store over a token directory and load it
    pub fn open<P: AsRef<Path>>(root: P) -> Result<(Self, LoadReport)> {
        let mut store = Self {
            root: root.as_ref().to_path_buf(),
            tree: TokenNode::new(),
        };
        let report = store.load()?;
        Ok((store, report))
    }

    /// Read every storage unit into one merged tree, replacing the previous
    /// tree. Units load in the fixed table order; where two units define
    /// the same leaf path, the later-loaded unit wins and the override is
    /// recorded in the report. Idempotent.
    pub fn load(&mut self) -> Result<LoadReport> {
        let mut tree = TokenNode::new();
        let mut report = LoadReport::default();

        for unit in StorageUnit::all() {
            let file = unit.file_path(&self.root);
            if !file.exists() {
                continue;
            }
            let content = fs::read_to_string(&file)?;
            let subtree = parse_unit(&content)?;

            merge_node(&mut tree, subtree, "", &mut report.overrides);
            report.units_loaded.push(unit);
        }

        report.leaf_count = tree.count_leaves();
        log::debug!("token store loaded: {}", report.summary());

        self.tree = tree;
        Ok(report)
    }

    /// Root directory holding the storage units
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Pure tree lookup by path, no alias resolution
    pub fn get(&self, path: &TokenPath) -> Option<&TokenRecord> {
        self.tree.get(path.segments())?.record.as_ref()
    }

    /// Check whether a path names a token
    pub fn contains(&self, path: &TokenPath) -> bool {
        self.get(path).is_some()
    }

    /// Number of tokens (nodes carrying a raw value) in the tree
    pub fn count_leaves(&self) -> usize {
        self.tree.count_leaves()
    }

    /// Every token in the tree, depth-first in sorted sibling order
    pub fn tokens(&self) -> Vec<(TokenPath, &TokenRecord)> {
        let mut out = Vec::new();
        self.tree.collect_tokens("", &mut out);
        out
    }

    /// Every token at or under `prefix`, depth-first
    pub fn tokens_under(&self, prefix: &TokenPath) -> Vec<(TokenPath, &TokenRecord)> {
        let mut out = Vec::new();
        if let Some(node) = self.tree.get(prefix.segments()) {
            node.collect_tokens(prefix.as_str(), &mut out);
        }
        out
    }

    /// Combined content hash of every unit file present on disk, in load
    /// order. Lets callers verify that an operation had no storage side
    /// effects.
    pub fn checksum(&self) -> Result<ContentHash> {
        let mut hashes = Vec::new();
        for unit in StorageUnit::all() {
            let file = unit.file_path(&self.root);
            if file.exists() {
                hashes.push(ContentHash::from_file(&file)?);
            }
        }
        Ok(ContentHash::combine(hashes.iter()))
    }
}

/// Deep key-wise union of `src` into `dest`. Children combine; duplicate
/// leaf records are replaced by `src` and recorded.
fn merge_node(dest: &mut TokenNode, src: TokenNode, prefix: &str, overrides: &mut Vec<TokenPath>) {
    if let Some(record) = src.record {
        if dest.record.is_some() {
            if let Ok(path) = TokenPath::parse(prefix) {
                overrides.push(path);
            }
        }
        dest.record = Some(record);
    }
    for (name, child) in src.children {
        let child_prefix = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };
        let dest_child = dest.children.entry(name).or_default();
        merge_node(dest_child, child, &child_prefix, overrides);
    }
}
