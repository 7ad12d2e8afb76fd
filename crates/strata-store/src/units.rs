//! Storage unit addressing
//!
//! The mapping from (tier, category) to a document on disk is a fixed,
//! enumerable table. Units load in tier-priority order (base, then
//! semantic, then component) so that leaf-level overrides across units are
//! deterministic: the later tier wins.

use std::path::{Path, PathBuf};
use strata_core::TokenPath;

/// Storage tiers, in merge-priority order
pub const TIERS: &[&str] = &["base", "semantic", "component"];

/// Token categories, one document per category within a tier
pub const CATEGORIES: &[&str] = &[
    "color",
    "dimension",
    "elevation",
    "motion",
    "opacity",
    "typography",
];

/// Address of one persisted token document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageUnit {
    pub tier: String,
    pub category: String,
}

impl StorageUnit {
    /// Look up the unit owning a path. Returns `None` when the path is too
    /// short to carry a (tier, category) prefix or the prefix is not in the
    /// fixed table.
    pub fn for_path(path: &TokenPath) -> Option<Self> {
        let tier = path.tier();
        let category = path.category()?;
        if !TIERS.contains(&tier) || !CATEGORIES.contains(&category) {
            return None;
        }
        Some(Self {
            tier: tier.to_string(),
            category: category.to_string(),
        })
    }

    /// Enumerate every unit in deterministic load order
    pub fn all() -> Vec<Self> {
        let mut units = Vec::with_capacity(TIERS.len() * CATEGORIES.len());
        for tier in TIERS {
            for category in CATEGORIES {
                units.push(Self {
                    tier: tier.to_string(),
                    category: category.to_string(),
                });
            }
        }
        units
    }

    /// The document path for this unit: `<root>/<tier>/<category>.toml`
    pub fn file_path(&self, root: &Path) -> PathBuf {
        root.join(&self.tier).join(format!("{}.toml", self.category))
    }

    /// The path prefix this unit owns, e.g. `base.color`
    pub fn prefix(&self) -> String {
        format!("{}.{}", self.tier, self.category)
    }
}
