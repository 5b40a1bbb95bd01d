//! Task data model.
//!
//! Tasks are the atomic units of delegated work. Each task is written to
//! `tasks/<task-id>.json` when created and rewritten in place on every
//! status transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a task within a session.
///
/// Short form of a UUID v4, e.g. `task-3fa4b21c`. Task ids double as file
/// names in the tasks and results directories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Mint a new unique task identifier.
    pub fn new() -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        Self(format!("task-{}", &uuid[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Worker specializations available for task assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerRole {
    /// Code analysis, research, information gathering (read-only).
    Investigator,
    /// Code writing and modification.
    Implementer,
    /// Test writing and execution.
    Tester,
}

impl WorkerRole {
    pub const ALL: [WorkerRole; 3] = [
        WorkerRole::Investigator,
        WorkerRole::Implementer,
        WorkerRole::Tester,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerRole::Investigator => "investigator",
            WorkerRole::Implementer => "implementer",
            WorkerRole::Tester => "tester",
        }
    }
}

impl std::fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WorkerRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "investigator" => Ok(WorkerRole::Investigator),
            "implementer" => Ok(WorkerRole::Implementer),
            "tester" => Ok(WorkerRole::Tester),
            other => Err(format!("unknown worker role: {}", other)),
        }
    }
}

/// Task status lifecycle.
///
/// ```text
/// pending --(all deps complete)--> assigned --(worker claims)--> running
///     --(executor result)--> success | failure
/// pending --(no deps)--> assigned   [at creation time]
/// ```
///
/// `success` and `failure` are terminal and never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for dependencies to complete.
    Pending,
    /// Ready to be claimed by its assignee.
    Assigned,
    /// Currently being executed by a worker.
    Running,
    /// Completed successfully.
    Success,
    /// Completed with a failure.
    Failure,
}

impl TaskStatus {
    /// Terminal states. Failure counts as complete for unblocking purposes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failure)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Assigned => "assigned",
            TaskStatus::Running => "running",
            TaskStatus::Success => "success",
            TaskStatus::Failure => "failure",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single unit of delegated work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, stable once created.
    pub id: TaskId,
    /// Short human-readable title.
    pub title: String,
    /// Detailed description with instructions.
    pub description: String,
    /// Worker specialization this task requires.
    pub role: WorkerRole,
    /// Specific worker identity, e.g. `investigator-1`, chosen at creation.
    pub assignee: String,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Ids of tasks in the same batch that must complete first.
    pub dependencies: Vec<TaskId>,
    /// Free-text context blob carried into the execution prompt.
    pub context: String,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task.
    ///
    /// Initial status is `assigned` when the dependency list is empty and
    /// `pending` otherwise.
    pub fn new(
        title: &str,
        description: &str,
        role: WorkerRole,
        assignee: &str,
        dependencies: Vec<TaskId>,
    ) -> Self {
        let status = if dependencies.is_empty() {
            TaskStatus::Assigned
        } else {
            TaskStatus::Pending
        };
        Self {
            id: TaskId::new(),
            title: title.to_string(),
            description: description.to_string(),
            role,
            assignee: assignee.to_string(),
            status,
            dependencies,
            context: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Check if the task is in a terminal state.
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}
