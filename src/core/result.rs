//! Task result data model.
//!
//! A result is the terminal record of exactly one task, written once by the
//! worker that claimed it to `results/<task-id>.json` and immutable after
//! that. The coordinator treats its appearance as the completion event.

use serde::{Deserialize, Serialize};

use crate::core::task::TaskId;

/// Terminal outcome of a task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Failure,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Success => "success",
            ResultStatus::Failure => "failure",
        }
    }
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happened to a file during task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactAction {
    Created,
    Modified,
    Deleted,
}

/// A file touched by a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    pub action: ArtifactAction,
}

/// The terminal record produced by executing one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Id of the task this result belongs to.
    pub task_id: TaskId,
    /// Whether the execution succeeded.
    pub status: ResultStatus,
    /// Main output text of the task.
    pub output: String,
    /// Files created, modified, or deleted.
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    /// Knowledge the rest of the team should see, replayed into future
    /// prompts via the shared context. Empty means nothing to share.
    #[serde(default)]
    pub context_contribution: String,
    /// Executor cost in USD, when the envelope reported one.
    #[serde(default)]
    pub cost_usd: f64,
    /// Wall-clock execution time.
    #[serde(default)]
    pub duration_ms: u64,
}

impl TaskResult {
    /// Build a failure result carrying the best available diagnostic text.
    pub fn failure(task_id: TaskId, diagnostic: &str, duration_ms: u64) -> Self {
        Self {
            task_id,
            status: ResultStatus::Failure,
            output: diagnostic.to_string(),
            artifacts: Vec::new(),
            context_contribution: String::new(),
            cost_usd: 0.0,
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}
