//! The shared fix vocabulary
//!
//! A `FixRequest` is an immutable remediation proposal. Its target
//! subsystem is derived from the taxonomy tag through a fixed routing
//! table — callers never pick the target, and a request routed to human
//! review is never auto-fixable no matter what the caller claims.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Sentinel target for requests no subsystem owns
pub const HUMAN_REVIEW: &str = "human-review";

/// Taxonomy-prefix routing table. First match wins; unmapped tags go to
/// human review.
const ROUTES: &[(&str, &str)] = &[
    ("token.", "tokens"),
    ("motion.", "motion"),
    ("a11y.", "accessibility"),
];

/// Map a taxonomy tag to its owning subsystem
pub fn route_target(fix_type: &str) -> &'static str {
    ROUTES
        .iter()
        .find(|(prefix, _)| fix_type.starts_with(prefix))
        .map(|(_, target)| *target)
        .unwrap_or(HUMAN_REVIEW)
}

/// Severity of the issue a fix addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// An immutable remediation proposal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixRequest {
    /// Unique request ID (UUID)
    pub id: String,
    /// Taxonomy tag, e.g. `token.contrast`
    pub fix_type: String,
    pub severity: Severity,
    /// Detector subsystem that raised the issue
    pub origin: String,
    /// Owning subsystem, derived from `fix_type`
    pub target: String,
    /// Remediation payload; opaque to the orchestrator
    pub payload: toml::Value,
    /// Whether the target may apply this without a human in the loop.
    /// Always false for human-review targets.
    pub auto_fixable: bool,
    /// ISO 8601 timestamp when created
    pub created_at: String,
}

impl FixRequest {
    /// Build a request, stamping id and timestamp and deriving the target
    /// from the routing table
    pub fn new(
        fix_type: impl Into<String>,
        severity: Severity,
        origin: impl Into<String>,
        payload: toml::Value,
        auto_fixable: bool,
    ) -> Self {
        let fix_type = fix_type.into();
        let target = route_target(&fix_type).to_string();
        let auto_fixable = auto_fixable && target != HUMAN_REVIEW;
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            fix_type,
            severity,
            origin: origin.into(),
            target,
            payload,
            auto_fixable,
            created_at: now_iso8601(),
        }
    }

    /// Check if this request is routed to the human-review sentinel
    pub fn needs_human(&self) -> bool {
        self.target == HUMAN_REVIEW
    }
}

/// Outcome of applying one fix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixResult {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Description of what changed, for the audit log
    #[serde(default)]
    pub changes: Option<String>,
    /// Whether the orchestrator should re-run detectors afterwards
    #[serde(default)]
    pub needs_validation: bool,
}

impl FixResult {
    /// A successful application that warrants re-validation
    pub fn applied(changes: impl Into<String>) -> Self {
        Self {
            success: true,
            error: None,
            changes: Some(changes.into()),
            needs_validation: true,
        }
    }

    /// A failed application
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            changes: None,
            needs_validation: false,
        }
    }
}

/// Group requests by their routed target
pub fn group_by_target(requests: &[FixRequest]) -> BTreeMap<&str, Vec<&FixRequest>> {
    let mut groups: BTreeMap<&str, Vec<&FixRequest>> = BTreeMap::new();
    for request in requests {
        groups.entry(request.target.as_str()).or_default().push(request);
    }
    groups
}

/// Split requests into (auto-fixable, needs-review). Auto-fixable strictly
/// requires both the flag and a non-sentinel target.
pub fn partition_auto_fixable(requests: &[FixRequest]) -> (Vec<&FixRequest>, Vec<&FixRequest>) {
    requests
        .iter()
        .partition(|request| request.auto_fixable && !request.needs_human())
}

/// Current UTC time as `YYYY-MM-DDTHH:MM:SSZ`
pub(crate) fn now_iso8601() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let (year, month, day) = civil_from_days((secs / 86400) as i64);
    let rem = secs % 86400;
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

/// Days-since-epoch to (year, month, day), proleptic Gregorian
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month as u32, day as u32)
}
