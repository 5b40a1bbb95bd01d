//! Task decomposition adapter.
//!
//! Turns a natural-language request plus accumulated context into a batch
//! of assigned tasks by delegating to the agent executor, then normalizing
//! and assigning the returned plan. The adapter never retries; a failed
//! decomposition aborts the request and the operator tries again.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use crate::core::{Task, TaskId, TeamConfig, WorkerRole};
use crate::error::{Error, Result};
use crate::schemas::task_plan_schema;
use crate::worker::prompt::{build_planning_prompt, PLANNER_SYSTEM};
use crate::worker::runner::{AgentRunner, RunRequest};
use crate::{hlog, hlog_warn};

/// A task as planned by the executor, before ids and assignees exist.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlannedTask {
    pub title: String,
    pub description: String,
    pub role: WorkerRole,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// The normalized decomposition output.
#[derive(Debug, Clone, Default)]
pub struct TaskPlan {
    pub tasks: Vec<PlannedTask>,
    pub summary: String,
}

impl TaskPlan {
    /// Normalize a raw executor payload into a plan.
    ///
    /// A missing or non-array `tasks` field yields an empty task list (a
    /// degraded plan, not an error); a missing summary becomes "".
    pub fn from_value(value: Value) -> Self {
        let summary = value
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let tasks = match value.get("tasks") {
            Some(Value::Array(items)) => {
                match serde_json::from_value::<Vec<PlannedTask>>(Value::Array(items.clone())) {
                    Ok(tasks) => tasks,
                    Err(e) => {
                        hlog_warn!("plan tasks did not match the schema ({}), defaulting to empty", e);
                        Vec::new()
                    }
                }
            }
            Some(other) => {
                hlog_warn!(
                    "plan tasks is not an array (got {}), defaulting to empty",
                    type_name(other)
                );
                Vec::new()
            }
            None => {
                hlog_warn!("plan has no tasks field, defaulting to empty");
                Vec::new()
            }
        };

        Self { tasks, summary }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub struct TaskPlanner {
    runner: AgentRunner,
}

impl TaskPlanner {
    pub fn new(runner: AgentRunner) -> Self {
        Self { runner }
    }

    /// Decompose a request into a plan via the agent executor.
    ///
    /// # Errors
    /// `Error::Planning` when the executor call fails or exits non-zero.
    pub async fn plan_tasks(
        &self,
        request: &str,
        context_summary: Option<&str>,
        directives: &[String],
        cwd: Option<PathBuf>,
    ) -> Result<TaskPlan> {
        let prompt = build_planning_prompt(request, context_summary, directives);

        let outcome = self
            .runner
            .run(&RunRequest {
                prompt,
                system_prompt: Some(PLANNER_SYSTEM.to_string()),
                json_schema: Some(task_plan_schema()),
                max_turns: Some(1),
                cwd,
            })
            .await
            .map_err(|e| Error::Planning(e.to_string()))?;

        if !outcome.is_success() {
            return Err(Error::Planning(format!(
                "task planning failed with exit code {}",
                outcome.exit_code
            )));
        }

        let value: Value = crate::worker::runner::parse_structured(&outcome.output)
            .map_err(|e| Error::Planning(e.to_string()))?;
        let plan = TaskPlan::from_value(value);
        hlog!("planned {} tasks: {}", plan.tasks.len(), plan.summary);
        Ok(plan)
    }

    /// Convert a plan into assigned tasks.
    ///
    /// Two passes: first mint an id for every planned title, then resolve
    /// each dependency title through that lookup. A dependency title that
    /// matches no planned title is dropped without error; the task behaves
    /// as if that dependency did not exist. Assignees are picked round-robin
    /// within each role, deterministic in plan order.
    pub fn assign_tasks(&self, plan: &TaskPlan, team: &TeamConfig) -> Vec<Task> {
        let title_to_id: std::collections::HashMap<&str, TaskId> = plan
            .tasks
            .iter()
            .map(|planned| (planned.title.as_str(), TaskId::new()))
            .collect();

        let mut counters = RoleCounters::default();
        let mut tasks = Vec::with_capacity(plan.tasks.len());

        for planned in &plan.tasks {
            let dependencies: Vec<TaskId> = planned
                .dependencies
                .iter()
                .filter_map(|title| title_to_id.get(title.as_str()).cloned())
                .collect();

            let assignee = counters.pick(planned.role, team);
            let mut task = Task::new(
                &planned.title,
                &planned.description,
                planned.role,
                &assignee,
                dependencies,
            );
            // Ids were minted in the first pass
            task.id = title_to_id[planned.title.as_str()].clone();
            tasks.push(task);
        }

        tasks
    }
}

/// Per-role round-robin counters.
///
/// Worker index for the n-th task of a role (0-based counter) is
/// `(n % capacity) + 1`, guaranteeing even distribution across the fixed
/// pool.
#[derive(Debug, Default)]
struct RoleCounters {
    investigator: usize,
    implementer: usize,
    tester: usize,
}

impl RoleCounters {
    fn pick(&mut self, role: WorkerRole, team: &TeamConfig) -> String {
        let counter = match role {
            WorkerRole::Investigator => &mut self.investigator,
            WorkerRole::Implementer => &mut self.implementer,
            WorkerRole::Tester => &mut self.tester,
        };
        let index = (*counter % team.capacity(role)) + 1;
        *counter += 1;
        format!("{}-{}", role.as_str(), index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskStatus;
    use serde_json::json;
    use std::path::PathBuf;

    fn planner() -> TaskPlanner {
        TaskPlanner::new(AgentRunner::with_binary(PathBuf::from("/nonexistent/agent")))
    }

    fn planned(title: &str, role: WorkerRole, deps: &[&str]) -> PlannedTask {
        PlannedTask {
            title: title.to_string(),
            description: format!("{} description", title),
            role,
            dependencies: deps.iter().map(|s| s.to_string()).collect(),
        }
    }

    // ---- Plan normalization ----

    #[test]
    fn test_plan_from_well_formed_value() {
        let plan = TaskPlan::from_value(json!({
            "tasks": [
                {"title": "a", "description": "d", "role": "investigator", "dependencies": []}
            ],
            "summary": "one task"
        }));
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.summary, "one task");
    }

    #[test]
    fn test_plan_missing_tasks_field_is_degraded_not_error() {
        let plan = TaskPlan::from_value(json!({"summary": "ok"}));
        assert!(plan.tasks.is_empty());
        assert_eq!(plan.summary, "ok");
    }

    #[test]
    fn test_plan_tasks_not_an_array_is_degraded() {
        let plan = TaskPlan::from_value(json!({"tasks": "oops", "summary": "ok"}));
        assert!(plan.tasks.is_empty());
        assert_eq!(plan.summary, "ok");
    }

    #[test]
    fn test_plan_missing_summary_defaults_empty() {
        let plan = TaskPlan::from_value(json!({"tasks": []}));
        assert_eq!(plan.summary, "");
    }

    #[test]
    fn test_plan_dependencies_field_optional_per_task() {
        let plan = TaskPlan::from_value(json!({
            "tasks": [{"title": "a", "description": "d", "role": "tester"}],
            "summary": ""
        }));
        assert_eq!(plan.tasks.len(), 1);
        assert!(plan.tasks[0].dependencies.is_empty());
    }

    // ---- Assignment ----

    #[test]
    fn test_assign_round_robin_within_role() {
        let planner = planner();
        let team = TeamConfig {
            investigators: 2,
            implementers: 2,
            testers: 1,
        };
        let plan = TaskPlan {
            tasks: vec![
                planned("a", WorkerRole::Investigator, &[]),
                planned("b", WorkerRole::Investigator, &[]),
                planned("c", WorkerRole::Investigator, &[]),
                planned("d", WorkerRole::Investigator, &[]),
                planned("e", WorkerRole::Investigator, &[]),
            ],
            summary: String::new(),
        };

        let tasks = planner.assign_tasks(&plan, &team);
        let assignees: Vec<&str> = tasks.iter().map(|t| t.assignee.as_str()).collect();
        // i-th task (1-indexed) goes to worker ((i-1) mod k) + 1
        assert_eq!(
            assignees,
            vec![
                "investigator-1",
                "investigator-2",
                "investigator-1",
                "investigator-2",
                "investigator-1"
            ]
        );
    }

    #[test]
    fn test_assign_counters_are_per_role() {
        let planner = planner();
        let team = TeamConfig::default();
        let plan = TaskPlan {
            tasks: vec![
                planned("a", WorkerRole::Investigator, &[]),
                planned("b", WorkerRole::Implementer, &[]),
                planned("c", WorkerRole::Tester, &[]),
                planned("d", WorkerRole::Implementer, &[]),
            ],
            summary: String::new(),
        };

        let tasks = planner.assign_tasks(&plan, &team);
        assert_eq!(tasks[0].assignee, "investigator-1");
        assert_eq!(tasks[1].assignee, "implementer-1");
        assert_eq!(tasks[2].assignee, "tester-1");
        assert_eq!(tasks[3].assignee, "implementer-2");
    }

    #[test]
    fn test_assign_resolves_dependency_titles() {
        let planner = planner();
        let plan = TaskPlan {
            tasks: vec![
                planned("investigate", WorkerRole::Investigator, &[]),
                planned("implement", WorkerRole::Implementer, &["investigate"]),
            ],
            summary: String::new(),
        };

        let tasks = planner.assign_tasks(&plan, &TeamConfig::default());
        assert_eq!(tasks[1].dependencies, vec![tasks[0].id.clone()]);
        assert_eq!(tasks[0].status, TaskStatus::Assigned);
        assert_eq!(tasks[1].status, TaskStatus::Pending);
    }

    #[test]
    fn test_assign_drops_unresolved_dependency_title() {
        let planner = planner();
        let plan = TaskPlan {
            tasks: vec![
                planned("investigate", WorkerRole::Investigator, &[]),
                planned(
                    "implement",
                    WorkerRole::Implementer,
                    &["investigate", "no such task"],
                ),
            ],
            summary: String::new(),
        };

        let tasks = planner.assign_tasks(&plan, &TeamConfig::default());
        // The phantom title produced no id and is silently dropped; the
        // task's unblock state depends only on its resolvable dependency.
        assert_eq!(tasks[1].dependencies.len(), 1);
        assert_eq!(tasks[1].dependencies[0], tasks[0].id);
    }

    #[test]
    fn test_assign_all_unresolved_deps_means_assigned_at_creation() {
        let planner = planner();
        let plan = TaskPlan {
            tasks: vec![planned("implement", WorkerRole::Implementer, &["typo title"])],
            summary: String::new(),
        };

        let tasks = planner.assign_tasks(&plan, &TeamConfig::default());
        assert!(tasks[0].dependencies.is_empty());
        assert_eq!(tasks[0].status, TaskStatus::Assigned);
    }

    #[test]
    fn test_assign_forward_dependency_resolves() {
        // Two-pass minting: a task may depend on a title planned later.
        let planner = planner();
        let plan = TaskPlan {
            tasks: vec![
                planned("verify", WorkerRole::Tester, &["build"]),
                planned("build", WorkerRole::Implementer, &[]),
            ],
            summary: String::new(),
        };

        let tasks = planner.assign_tasks(&plan, &TeamConfig::default());
        assert_eq!(tasks[0].dependencies, vec![tasks[1].id.clone()]);
    }

    #[tokio::test]
    async fn test_plan_tasks_spawn_failure_is_planning_error() {
        let planner = planner();
        let err = planner
            .plan_tasks("add login", None, &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Planning(_)));
    }
}
