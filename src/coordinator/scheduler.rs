//! Dependency-driven task scheduler.
//!
//! Pure logic over the in-memory task batch plus the store: decides which
//! pending tasks become runnable as their dependencies reach a terminal
//! state, and reports aggregate status. A failed dependency unblocks its
//! dependents the same as a successful one, so a chain never stalls on one
//! broken link.

use std::collections::{BTreeMap, HashSet};

use crate::core::{Task, TaskId, TaskStatus};
use crate::error::Result;
use crate::hlog;
use crate::store::FileStore;

pub struct TaskScheduler {
    store: FileStore,
}

impl TaskScheduler {
    pub fn new(store: FileStore) -> Self {
        Self { store }
    }

    /// Persist a freshly created batch.
    pub fn write_tasks(&self, tasks: &[Task]) -> Result<()> {
        for task in tasks {
            self.store.write_task(task)?;
            hlog!(
                "wrote task {}: {} -> {}",
                task.id,
                task.title,
                task.assignee
            );
        }
        Ok(())
    }

    /// Transition every pending task whose dependencies have all completed
    /// to `assigned`, persisting each transition.
    ///
    /// Returns exactly the tasks transitioned in this call; an empty list
    /// is a common result. Idempotent: with no intervening status change a
    /// second call returns nothing.
    pub fn resolve_dependencies(&self, tasks: &mut [Task]) -> Result<Vec<Task>> {
        let completed: HashSet<TaskId> = tasks
            .iter()
            .filter(|t| t.status.is_terminal())
            .map(|t| t.id.clone())
            .collect();

        let mut newly_assigned = Vec::new();
        for task in tasks.iter_mut() {
            if task.status != TaskStatus::Pending {
                continue;
            }
            if task.dependencies.iter().all(|dep| completed.contains(dep)) {
                task.status = TaskStatus::Assigned;
                self.store.write_task(task)?;
                hlog!("unblocked task {}: {}", task.id, task.title);
                newly_assigned.push(task.clone());
            }
        }
        Ok(newly_assigned)
    }

    /// True iff every task in the batch reached success or failure.
    pub fn is_all_complete(&self, tasks: &[Task]) -> bool {
        tasks.iter().all(|t| t.status.is_terminal())
    }

    /// Tasks currently runnable or in flight.
    pub fn active_tasks<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks
            .iter()
            .filter(|t| matches!(t.status, TaskStatus::Assigned | TaskStatus::Running))
            .collect()
    }

    /// Tasks still waiting on dependencies.
    pub fn pending_tasks<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .collect()
    }

    /// Count of tasks per status, in stable order.
    pub fn status_summary(&self, tasks: &[Task]) -> BTreeMap<&'static str, usize> {
        let mut summary = BTreeMap::new();
        for task in tasks {
            *summary.entry(task.status.as_str()).or_insert(0) += 1;
        }
        summary
    }
}
