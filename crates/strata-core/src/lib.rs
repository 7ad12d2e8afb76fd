//! Strata Core - Foundational types for the Strata token engine
//!
//! This crate provides the core types that all other Strata crates depend on:
//! - `TokenPath` - Dot-separated token identity
//! - `RawValue`, `TokenValue` - Literal and alias value forms
//! - `ContentHash` - SHA-256 based content hashing
//! - Error types and Result alias

mod error;
mod hash;
mod path;
mod value;

pub use error::{Result, StrataError};
pub use hash::ContentHash;
pub use path::TokenPath;
pub use value::{RawValue, TokenValue, KNOWN_KINDS};
