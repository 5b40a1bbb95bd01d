//! Advisory directive-compliance review.
//!
//! After a task succeeds, and only when standing directives exist, the
//! coordinator asks the executor whether the output honors every directive.
//! The verdict is purely informational: it is logged for the operator and
//! never changes task state, and any failure along the way yields no
//! verdict at all rather than an error.

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::{Task, TaskResult};
use crate::hlog_debug;
use crate::schemas::compliance_schema;
use crate::worker::prompt::{build_compliance_prompt, COMPLIANCE_SYSTEM};
use crate::worker::runner::{parse_structured, AgentRunner, RunRequest};

/// One violated directive with the reviewer's reasoning.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Violation {
    pub directive: String,
    pub reason: String,
}

/// The reviewer's verdict on one task output.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ComplianceVerdict {
    pub compliant: bool,
    #[serde(default)]
    pub violations: Vec<Violation>,
    #[serde(default)]
    pub summary: String,
}

pub struct ComplianceChecker {
    runner: AgentRunner,
}

impl ComplianceChecker {
    pub fn new(runner: AgentRunner) -> Self {
        Self { runner }
    }

    /// Whether a review is warranted at all.
    ///
    /// Strict conjunction: the result must be a success and at least one
    /// directive must be standing. Failed tasks are never reviewed; their
    /// diagnostics would drown the reviewer in noise.
    pub fn should_check(result: &TaskResult, directives: &[String]) -> bool {
        result.is_success() && !directives.is_empty()
    }

    /// Review a task output against the standing directives.
    ///
    /// Returns `None` on any failure: executor spawn error, non-zero exit,
    /// or unparseable output. The caller treats an absent verdict the same
    /// as no review having happened.
    pub async fn check(
        &self,
        task: &Task,
        result: &TaskResult,
        directives: &[String],
        cwd: Option<PathBuf>,
    ) -> Option<ComplianceVerdict> {
        if !Self::should_check(result, directives) {
            return None;
        }

        let prompt = build_compliance_prompt(task, &result.output, directives);
        let outcome = self
            .runner
            .run(&RunRequest {
                prompt,
                system_prompt: Some(COMPLIANCE_SYSTEM.to_string()),
                json_schema: Some(compliance_schema()),
                max_turns: Some(1),
                cwd,
            })
            .await;

        let outcome = match outcome {
            Ok(outcome) if outcome.is_success() => outcome,
            Ok(outcome) => {
                hlog_debug!(
                    "compliance review for {} exited {}, skipping verdict",
                    task.id,
                    outcome.exit_code
                );
                return None;
            }
            Err(e) => {
                hlog_debug!("compliance review for {} failed: {}", task.id, e);
                return None;
            }
        };

        match parse_structured::<ComplianceVerdict>(&outcome.output) {
            Ok(verdict) => Some(verdict),
            Err(e) => {
                hlog_debug!("compliance verdict for {} unparseable: {}", task.id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ResultStatus, TaskId, WorkerRole};

    fn result(status: ResultStatus) -> TaskResult {
        TaskResult {
            task_id: TaskId::from("task-11111111"),
            status,
            output: "changed the handler".to_string(),
            artifacts: vec![],
            context_contribution: String::new(),
            cost_usd: 0.0,
            duration_ms: 50,
        }
    }

    #[test]
    fn test_should_check_requires_success_and_directives() {
        let directives = vec!["use tabs".to_string()];
        assert!(ComplianceChecker::should_check(
            &result(ResultStatus::Success),
            &directives
        ));
        assert!(!ComplianceChecker::should_check(
            &result(ResultStatus::Failure),
            &directives
        ));
        assert!(!ComplianceChecker::should_check(
            &result(ResultStatus::Success),
            &[]
        ));
        assert!(!ComplianceChecker::should_check(
            &result(ResultStatus::Failure),
            &[]
        ));
    }

    #[test]
    fn test_verdict_deserializes_with_optional_fields() {
        let verdict: ComplianceVerdict =
            serde_json::from_str(r#"{"compliant": true}"#).unwrap();
        assert!(verdict.compliant);
        assert!(verdict.violations.is_empty());
        assert_eq!(verdict.summary, "");
    }

    #[tokio::test]
    async fn test_check_returns_none_on_executor_failure() {
        let checker = ComplianceChecker::new(AgentRunner::with_binary(
            PathBuf::from("/nonexistent/agent"),
        ));
        let task = Task::new(
            "fix handler",
            "fix the handler",
            WorkerRole::Implementer,
            "implementer-1",
            vec![],
        );
        let directives = vec!["use tabs".to_string()];
        let verdict = checker
            .check(&task, &result(ResultStatus::Success), &directives, None)
            .await;
        assert!(verdict.is_none());
    }

    #[tokio::test]
    async fn test_check_skips_when_not_warranted() {
        let checker = ComplianceChecker::new(AgentRunner::with_binary(
            PathBuf::from("/nonexistent/agent"),
        ));
        let task = Task::new(
            "fix handler",
            "fix the handler",
            WorkerRole::Implementer,
            "implementer-1",
            vec![],
        );
        let verdict = checker
            .check(&task, &result(ResultStatus::Success), &[], None)
            .await;
        assert!(verdict.is_none());
    }
}
