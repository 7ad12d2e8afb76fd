//! Whole-tree structural validation

use crate::resolver::{ResolveDiagnostic, TokenResolver};
use serde::Serialize;
use std::collections::BTreeSet;
use strata_core::{TokenPath, KNOWN_KINDS};
use strata_store::TokenStore;

/// Severity of a structural issue. Only errors affect validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Warning,
    Error,
}

/// What kind of structural problem was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    UnknownKind,
    DanglingReference,
    CircularReference,
}

/// A single structural issue found during validation
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub path: TokenPath,
    pub severity: IssueSeverity,
    pub kind: IssueKind,
    pub message: String,
}

/// A complete validation report
#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    /// Check if the tree is valid (no errors; warnings don't count)
    pub fn is_valid(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|issue| issue.severity == IssueSeverity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Warning)
            .count()
    }

    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        if self.issues.is_empty() {
            return "No issues found.".to_string();
        }
        format!(
            "{} issue(s): {} error(s), {} warning(s)",
            self.issues.len(),
            self.error_count(),
            self.warning_count(),
        )
    }
}

/// Walks the entire tree once, reporting unknown kinds, dangling aliases,
/// and circular alias chains
pub struct GraphValidator<'a> {
    store: &'a TokenStore,
    resolver: &'a mut TokenResolver,
}

impl<'a> GraphValidator<'a> {
    /// Create a validator over the given store and resolver
    pub fn new(store: &'a TokenStore, resolver: &'a mut TokenResolver) -> Self {
        Self { store, resolver }
    }

    /// Run the full-tree walk
    pub fn validate(&mut self) -> ValidationReport {
        let mut report = ValidationReport::default();
        // Cycles surface once per loop, not once per member
        let mut reported_cycles: Vec<BTreeSet<String>> = Vec::new();

        for (path, record) in self.store.tokens() {
            if let Some(kind) = &record.kind {
                if !KNOWN_KINDS.contains(&kind.as_str()) {
                    report.issues.push(Issue {
                        message: format!("token '{}' declares unknown kind '{}'", path, kind),
                        path: path.clone(),
                        severity: IssueSeverity::Warning,
                        kind: IssueKind::UnknownKind,
                    });
                }
            }

            if let Some(target) = record.raw.reference() {
                if self.resolver.resolve(self.store, target.as_str(), false).is_none() {
                    report.issues.push(Issue {
                        message: format!(
                            "token '{}' references '{}', which does not exist",
                            path, target
                        ),
                        path: path.clone(),
                        severity: IssueSeverity::Error,
                        kind: IssueKind::DanglingReference,
                    });
                }
            }

            let resolved = match self.resolver.resolve(self.store, path.as_str(), true) {
                Some(resolved) => resolved,
                None => continue,
            };
            if let Some(ResolveDiagnostic::Cycle { chain }) = &resolved.diagnostic {
                let members: BTreeSet<String> = chain
                    .iter()
                    .map(|hop| hop.as_str().to_string())
                    .collect();
                if reported_cycles.contains(&members) {
                    continue;
                }
                report.issues.push(Issue {
                    message: format!(
                        "circular reference: {}",
                        chain
                            .iter()
                            .map(TokenPath::as_str)
                            .collect::<Vec<_>>()
                            .join(" -> ")
                    ),
                    path: path.clone(),
                    severity: IssueSeverity::Error,
                    kind: IssueKind::CircularReference,
                });
                reported_cycles.push(members);
            }
        }

        report
    }
}
