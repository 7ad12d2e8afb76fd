//! Strata Store - Tiered TOML token storage
//!
//! Tokens persist as one TOML document per (tier, category) storage unit.
//! `TokenStore` merges every unit into a single in-memory tree;
//! `TokenWriter` is the only component that mutates the documents on disk.

mod format;
mod store;
mod units;
mod writer;

pub use format::{parse_unit, TokenNode, TokenRecord};
pub use store::{LoadReport, TokenStore};
pub use units::{StorageUnit, CATEGORIES, TIERS};
pub use writer::{InvalidateCache, TokenWriter};
