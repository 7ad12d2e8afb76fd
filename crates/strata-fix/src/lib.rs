//! Strata Fix - Issue remediation protocol and orchestration
//!
//! Detectors (accessibility and motion rule engines, the graph validator)
//! produce `FixRequest`s; a static routing table assigns each to the
//! subsystem that owns its taxonomy, or to human review when nothing does.
//! The `Orchestrator` applies routed fixes through registered `FixApplier`
//! agents and drives the bounded validate -> fix -> re-validate loop.

mod agent;
mod orchestrator;
mod protocol;

pub use agent::{TokenAgent, TokenEngine};
pub use orchestrator::{
    CycleOptions, CycleOutcome, CycleResult, FailedFix, FixApplier, FixBatch, FixOptions,
    FixRecord, IssueDetector, IterationSummary, Orchestrator, ProcessedFix, SkippedFix,
    DEFAULT_MAX_ITERATIONS,
};
pub use protocol::{
    group_by_target, partition_auto_fixable, route_target, FixRequest, FixResult, Severity,
    HUMAN_REVIEW,
};
