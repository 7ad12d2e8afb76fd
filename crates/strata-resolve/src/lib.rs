//! Strata Resolve - The read path of the token engine
//!
//! `TokenResolver` turns raw token entries into fully-resolved values by
//! following alias chains, with cycle and dangling-reference detection and
//! a whole-store memoization cache. `GraphValidator` walks the entire tree
//! once and reports structural issues.

mod cache;
mod resolver;
mod validator;

pub use cache::ResolveCache;
pub use resolver::{ResolveDiagnostic, ResolvedToken, TokenResolver};
pub use validator::{GraphValidator, Issue, IssueKind, IssueSeverity, ValidationReport};
