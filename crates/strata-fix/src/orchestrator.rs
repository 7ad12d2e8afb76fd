//! Fix routing and the convergence loop

use crate::protocol::{now_iso8601, FixRequest, FixResult};
use serde::Serialize;
use std::collections::HashMap;

/// Default safety valve for the fix cycle. A termination bound, not a
/// convergence guarantee: detectors are free to keep finding new issues.
pub const DEFAULT_MAX_ITERATIONS: usize = 3;

/// Implemented by any subsystem that can apply routed fixes
pub trait FixApplier {
    /// Apply one fix. Failures are values: return an unsuccessful
    /// `FixResult` rather than panicking.
    fn apply_fix(&mut self, request: &FixRequest) -> FixResult;
}

/// Implemented by detector subsystems driving the fix cycle
pub trait IssueDetector {
    /// Clear prior issue state
    fn reset(&mut self);
    /// Validate from scratch, repopulating the issue list; returns the
    /// number of outstanding issues
    fn validate(&mut self) -> usize;
    /// Propose remediations for the current issue list
    fn suggest_fixes(&self) -> Vec<FixRequest>;
}

/// Options for one `process_fixes` batch
#[derive(Debug, Clone, Copy, Default)]
pub struct FixOptions {
    /// Only apply requests flagged auto-fixable
    pub auto_fix_only: bool,
    /// Record what would happen without calling any agent
    pub dry_run: bool,
}

/// A fix that was applied (or would be, in a dry run)
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedFix {
    pub request_id: String,
    pub fix_type: String,
    pub target: String,
    pub changes: Option<String>,
    pub dry_run: bool,
}

/// A fix that was skipped, with the reason
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFix {
    pub request_id: String,
    pub fix_type: String,
    pub reason: String,
}

/// A fix whose application failed
#[derive(Debug, Clone, Serialize)]
pub struct FailedFix {
    pub request_id: String,
    pub fix_type: String,
    pub error: String,
}

/// Outcome of one `process_fixes` batch
#[derive(Debug, Default, Serialize)]
pub struct FixBatch {
    /// Requests handed to an agent (dry-run "would apply" included)
    pub attempted: usize,
    /// Requests an agent applied successfully
    pub succeeded: usize,
    /// Requests an agent failed to apply
    pub failed: usize,
    /// Requests routed to the human-review sentinel (always skipped)
    pub human_review: usize,
    pub processed: Vec<ProcessedFix>,
    pub skipped: Vec<SkippedFix>,
    pub failures: Vec<FailedFix>,
}

/// One entry of the append-only audit log
#[derive(Debug, Clone, Serialize)]
pub struct FixRecord {
    pub request_id: String,
    pub fix_type: String,
    pub target: String,
    pub changes: Option<String>,
    pub applied_at: String,
}

/// Options for `run_fix_cycle`
#[derive(Debug, Clone, Copy)]
pub struct CycleOptions {
    pub auto_fix_only: bool,
    pub max_iterations: usize,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            auto_fix_only: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// How the fix cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleOutcome {
    /// The detector reported zero issues
    Converged,
    /// Issues remain but nothing actionable: no suggestions, no progress,
    /// or the iteration bound was reached
    Exhausted,
}

/// What one cycle iteration saw and did
#[derive(Debug, Clone, Serialize)]
pub struct IterationSummary {
    pub issues_found: usize,
    pub fixes_applied: usize,
    pub fixes_failed: usize,
}

/// Outcome of a whole fix cycle. Always returned, never an error — the
/// caller decides how to surface remaining issues.
#[derive(Debug, Serialize)]
pub struct CycleResult {
    pub outcome: CycleOutcome,
    /// Iterations that ran (a converged first validation counts zero)
    pub iterations: usize,
    pub summaries: Vec<IterationSummary>,
    pub total_fixed: usize,
    /// Issues outstanding at the last validation
    pub remaining_issues: usize,
}

/// Registry of fix-applying subsystems plus the cycle driver.
///
/// The orchestrator owns no token data — only the agent registry and the
/// append-only fix history.
#[derive(Default)]
pub struct Orchestrator {
    agents: HashMap<String, Box<dyn FixApplier>>,
    history: Vec<FixRecord>,
}

impl Orchestrator {
    /// Create an empty orchestrator
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subsystem under its routing identifier. Required before
    /// that target can receive fixes; requests for unregistered targets
    /// are skipped, not failed.
    pub fn register_agent(&mut self, id: impl Into<String>, agent: Box<dyn FixApplier>) {
        let id = id.into();
        log::debug!("registered fix agent '{}'", id);
        self.agents.insert(id, agent);
    }

    /// Check whether a target has a registered agent
    pub fn has_agent(&self, id: &str) -> bool {
        self.agents.contains_key(id)
    }

    /// The append-only audit log of successfully applied fixes
    pub fn history(&self) -> &[FixRecord] {
        &self.history
    }

    /// Route and apply a batch of fix requests.
    ///
    /// Human-review requests are counted and skipped. Individual agent
    /// failures are recorded per request and never abort the batch.
    pub fn process_fixes(&mut self, requests: &[FixRequest], options: FixOptions) -> FixBatch {
        let mut batch = FixBatch::default();

        for request in requests {
            if request.needs_human() {
                batch.human_review += 1;
                continue;
            }
            if options.auto_fix_only && !request.auto_fixable {
                batch.skipped.push(SkippedFix {
                    request_id: request.id.clone(),
                    fix_type: request.fix_type.clone(),
                    reason: "not auto-fixable".to_string(),
                });
                continue;
            }
            let agent = match self.agents.get_mut(&request.target) {
                Some(agent) => agent,
                None => {
                    batch.skipped.push(SkippedFix {
                        request_id: request.id.clone(),
                        fix_type: request.fix_type.clone(),
                        reason: format!("no agent registered for '{}'", request.target),
                    });
                    continue;
                }
            };

            batch.attempted += 1;

            if options.dry_run {
                batch.processed.push(ProcessedFix {
                    request_id: request.id.clone(),
                    fix_type: request.fix_type.clone(),
                    target: request.target.clone(),
                    changes: Some("would apply".to_string()),
                    dry_run: true,
                });
                continue;
            }

            let result = agent.apply_fix(request);
            if result.success {
                batch.succeeded += 1;
                self.history.push(FixRecord {
                    request_id: request.id.clone(),
                    fix_type: request.fix_type.clone(),
                    target: request.target.clone(),
                    changes: result.changes.clone(),
                    applied_at: now_iso8601(),
                });
                batch.processed.push(ProcessedFix {
                    request_id: request.id.clone(),
                    fix_type: request.fix_type.clone(),
                    target: request.target.clone(),
                    changes: result.changes,
                    dry_run: false,
                });
            } else {
                batch.failed += 1;
                let error = result.error.unwrap_or_else(|| "unspecified failure".to_string());
                log::warn!("fix {} ({}) failed: {}", request.id, request.fix_type, error);
                batch.failures.push(FailedFix {
                    request_id: request.id.clone(),
                    fix_type: request.fix_type.clone(),
                    error,
                });
            }
        }

        batch
    }

    /// Drive the detector toward zero issues: validate, suggest, apply,
    /// re-validate, bounded by `max_iterations`.
    ///
    /// Terminates within the bound regardless of detector behavior; a pass
    /// that applies nothing ends the cycle rather than looping on a stuck
    /// state.
    pub fn run_fix_cycle(
        &mut self,
        detector: &mut dyn IssueDetector,
        options: CycleOptions,
    ) -> CycleResult {
        let mut summaries = Vec::new();
        let mut total_fixed = 0;
        let mut last_issues = 0;

        for iteration in 1..=options.max_iterations {
            detector.reset();
            let issues = detector.validate();
            last_issues = issues;

            if issues == 0 {
                return CycleResult {
                    outcome: CycleOutcome::Converged,
                    iterations: iteration - 1,
                    summaries,
                    total_fixed,
                    remaining_issues: 0,
                };
            }

            let mut fixes = detector.suggest_fixes();
            if options.auto_fix_only {
                fixes.retain(|fix| fix.auto_fixable);
            }
            if fixes.is_empty() {
                summaries.push(IterationSummary {
                    issues_found: issues,
                    fixes_applied: 0,
                    fixes_failed: 0,
                });
                return CycleResult {
                    outcome: CycleOutcome::Exhausted,
                    iterations: iteration,
                    summaries,
                    total_fixed,
                    remaining_issues: issues,
                };
            }

            let batch = self.process_fixes(
                &fixes,
                FixOptions {
                    auto_fix_only: options.auto_fix_only,
                    dry_run: false,
                },
            );
            summaries.push(IterationSummary {
                issues_found: issues,
                fixes_applied: batch.succeeded,
                fixes_failed: batch.failed,
            });
            total_fixed += batch.succeeded;

            if batch.succeeded == 0 {
                return CycleResult {
                    outcome: CycleOutcome::Exhausted,
                    iterations: iteration,
                    summaries,
                    total_fixed,
                    remaining_issues: issues,
                };
            }
        }

        CycleResult {
            outcome: CycleOutcome::Exhausted,
            iterations: options.max_iterations,
            summaries,
            total_fixed,
            remaining_issues: last_issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Severity;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn token_request(auto_fixable: bool) -> FixRequest {
        FixRequest::new(
            "token.contrast",
            Severity::Error,
            "contrast-checker",
            toml::Value::Table(toml::map::Map::new()),
            auto_fixable,
        )
    }

    fn human_request() -> FixRequest {
        FixRequest::new(
            "layout.overflow",
            Severity::Warning,
            "layout-checker",
            toml::Value::Table(toml::map::Map::new()),
            true,
        )
    }

    /// Counts calls; succeeds or fails per configuration
    struct ScriptedApplier {
        calls: Rc<RefCell<usize>>,
        succeed: bool,
    }

    impl FixApplier for ScriptedApplier {
        fn apply_fix(&mut self, request: &FixRequest) -> FixResult {
            *self.calls.borrow_mut() += 1;
            if self.succeed {
                FixResult::applied(format!("fixed {}", request.fix_type))
            } else {
                FixResult::failed("agent declined")
            }
        }
    }

    fn register_scripted(orchestrator: &mut Orchestrator, succeed: bool) -> Rc<RefCell<usize>> {
        let calls = Rc::new(RefCell::new(0));
        orchestrator.register_agent(
            "tokens",
            Box::new(ScriptedApplier {
                calls: calls.clone(),
                succeed,
            }),
        );
        calls
    }

    #[test]
    fn test_process_applies_and_records_history() {
        let mut orchestrator = Orchestrator::new();
        let calls = register_scripted(&mut orchestrator, true);

        let batch = orchestrator.process_fixes(&[token_request(true)], FixOptions::default());
        assert_eq!(batch.attempted, 1);
        assert_eq!(batch.succeeded, 1);
        assert_eq!(batch.failed, 0);
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(orchestrator.history().len(), 1);
        assert_eq!(orchestrator.history()[0].target, "tokens");
    }

    #[test]
    fn test_history_stamps_application_time() {
        let mut orchestrator = Orchestrator::new();
        register_scripted(&mut orchestrator, true);

        // A request may sit in a queue long after creation; the audit log
        // must record when it was applied, not when it was created
        let mut request = token_request(true);
        request.created_at = "2020-01-01T00:00:00Z".to_string();

        orchestrator.process_fixes(&[request.clone()], FixOptions::default());
        let record = &orchestrator.history()[0];
        assert_ne!(record.applied_at, request.created_at);
        assert_eq!(record.applied_at.len(), 20);
        assert!(record.applied_at.ends_with('Z'));
    }

    #[test]
    fn test_unregistered_target_is_skipped_not_failed() {
        let mut orchestrator = Orchestrator::new();
        let batch = orchestrator.process_fixes(&[token_request(true)], FixOptions::default());
        assert_eq!(batch.attempted, 0);
        assert_eq!(batch.failed, 0);
        assert_eq!(batch.skipped.len(), 1);
        assert!(batch.skipped[0].reason.contains("tokens"));
    }

    #[test]
    fn test_human_review_is_counted_and_never_applied() {
        let mut orchestrator = Orchestrator::new();
        let calls = register_scripted(&mut orchestrator, true);

        let batch = orchestrator.process_fixes(&[human_request()], FixOptions::default());
        assert_eq!(batch.human_review, 1);
        assert_eq!(batch.attempted, 0);
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_auto_fix_only_filters() {
        let mut orchestrator = Orchestrator::new();
        register_scripted(&mut orchestrator, true);

        let batch = orchestrator.process_fixes(
            &[token_request(true), token_request(false)],
            FixOptions {
                auto_fix_only: true,
                dry_run: false,
            },
        );
        assert_eq!(batch.succeeded, 1);
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].reason, "not auto-fixable");
    }

    #[test]
    fn test_dry_run_calls_no_agent() {
        let mut orchestrator = Orchestrator::new();
        let calls = register_scripted(&mut orchestrator, true);

        let batch = orchestrator.process_fixes(
            &[token_request(true)],
            FixOptions {
                auto_fix_only: false,
                dry_run: true,
            },
        );
        assert_eq!(*calls.borrow(), 0);
        assert_eq!(batch.attempted, 1);
        assert_eq!(batch.succeeded, 0);
        assert!(batch.processed[0].dry_run);
        assert!(orchestrator.history().is_empty());
    }

    #[test]
    fn test_failure_recorded_without_aborting_batch() {
        let mut orchestrator = Orchestrator::new();
        register_scripted(&mut orchestrator, false);

        let batch =
            orchestrator.process_fixes(&[token_request(true), token_request(true)], FixOptions::default());
        assert_eq!(batch.attempted, 2);
        assert_eq!(batch.failed, 2);
        assert_eq!(batch.failures.len(), 2);
        assert_eq!(batch.failures[0].error, "agent declined");
        assert!(orchestrator.history().is_empty());
    }

    /// Always reports one issue and proposes only a human-review fix
    struct StubbornDetector;

    impl IssueDetector for StubbornDetector {
        fn reset(&mut self) {}
        fn validate(&mut self) -> usize {
            1
        }
        fn suggest_fixes(&self) -> Vec<FixRequest> {
            vec![human_request()]
        }
    }

    #[test]
    fn test_cycle_exhausts_on_stubborn_detector() {
        let mut orchestrator = Orchestrator::new();
        register_scripted(&mut orchestrator, true);

        let result = orchestrator.run_fix_cycle(
            &mut StubbornDetector,
            CycleOptions {
                auto_fix_only: false,
                max_iterations: 3,
            },
        );
        assert_eq!(result.outcome, CycleOutcome::Exhausted);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.total_fixed, 0);
        assert_eq!(result.remaining_issues, 1);
    }

    /// Reports `remaining` issues; one auto-fix per iteration resolves one
    struct CountdownDetector {
        remaining: Rc<RefCell<usize>>,
    }

    impl IssueDetector for CountdownDetector {
        fn reset(&mut self) {}
        fn validate(&mut self) -> usize {
            *self.remaining.borrow()
        }
        fn suggest_fixes(&self) -> Vec<FixRequest> {
            vec![token_request(true)]
        }
    }

    /// Applier that resolves one countdown issue per call
    struct CountdownApplier {
        remaining: Rc<RefCell<usize>>,
    }

    impl FixApplier for CountdownApplier {
        fn apply_fix(&mut self, _request: &FixRequest) -> FixResult {
            let mut remaining = self.remaining.borrow_mut();
            *remaining = remaining.saturating_sub(1);
            FixResult::applied("resolved one issue")
        }
    }

    #[test]
    fn test_cycle_converges_within_bound() {
        let issues = 4;
        let remaining = Rc::new(RefCell::new(issues));
        let mut orchestrator = Orchestrator::new();
        orchestrator.register_agent(
            "tokens",
            Box::new(CountdownApplier {
                remaining: remaining.clone(),
            }),
        );

        let mut detector = CountdownDetector {
            remaining: remaining.clone(),
        };
        let result = orchestrator.run_fix_cycle(
            &mut detector,
            CycleOptions {
                auto_fix_only: true,
                max_iterations: issues + 1,
            },
        );
        assert_eq!(result.outcome, CycleOutcome::Converged);
        assert_eq!(result.remaining_issues, 0);
        assert_eq!(result.total_fixed, issues);
        assert!(result.iterations <= issues);
        assert_eq!(result.summaries.len(), issues);
    }

    #[test]
    fn test_cycle_stops_at_iteration_bound() {
        // Detector keeps finding the same issues; fixes "succeed" but
        // change nothing
        struct EndlessDetector;
        impl IssueDetector for EndlessDetector {
            fn reset(&mut self) {}
            fn validate(&mut self) -> usize {
                5
            }
            fn suggest_fixes(&self) -> Vec<FixRequest> {
                vec![token_request(true)]
            }
        }

        let mut orchestrator = Orchestrator::new();
        register_scripted(&mut orchestrator, true);

        let result = orchestrator.run_fix_cycle(&mut EndlessDetector, CycleOptions::default());
        assert_eq!(result.outcome, CycleOutcome::Exhausted);
        assert_eq!(result.iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(result.summaries.len(), DEFAULT_MAX_ITERATIONS);
        assert_eq!(result.remaining_issues, 5);
    }

    #[test]
    fn test_cycle_converged_without_work() {
        struct CleanDetector;
        impl IssueDetector for CleanDetector {
            fn reset(&mut self) {}
            fn validate(&mut self) -> usize {
                0
            }
            fn suggest_fixes(&self) -> Vec<FixRequest> {
                Vec::new()
            }
        }

        let mut orchestrator = Orchestrator::new();
        let result = orchestrator.run_fix_cycle(&mut CleanDetector, CycleOptions::default());
        assert_eq!(result.outcome, CycleOutcome::Converged);
        assert_eq!(result.iterations, 0);
        assert!(result.summaries.is_empty());
    }
}
