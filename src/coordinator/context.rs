//! Shared-context aggregation.
//!
//! Successful tasks may contribute a short summary of what they learned or
//! changed; the coordinator folds those into a single shared document that
//! later prompts embed. Aggregation is append-only and lossy by intent:
//! empty contributions are skipped, and nothing is ever rewritten.

use crate::core::{ContextEntry, SharedContext, Task, TaskResult};
use crate::error::Result;
use crate::hlog;
use crate::store::FileStore;

pub struct ContextManager {
    store: FileStore,
}

impl ContextManager {
    pub fn new(store: FileStore) -> Self {
        Self { store }
    }

    /// Fold a finished task's contribution into the shared document.
    ///
    /// Skips results with an empty contribution. Returns whether an entry
    /// was appended.
    pub fn absorb_result(&self, task: &Task, result: &TaskResult) -> Result<bool> {
        let summary = result.context_contribution.trim();
        if summary.is_empty() {
            return Ok(false);
        }
        let entry = ContextEntry {
            from: task.assignee.clone(),
            task_id: task.id.clone(),
            summary: summary.to_string(),
        };
        self.store.append_context_entry(entry)?;
        hlog!("context entry absorbed from {} ({})", task.assignee, task.id);
        Ok(true)
    }

    /// Render the shared document for embedding into a prompt.
    ///
    /// Returns `None` when no entries exist yet, so callers can omit the
    /// section entirely.
    pub fn summary(&self) -> Result<Option<String>> {
        let context = self.store.read_context()?;
        if context.is_empty() {
            return Ok(None);
        }
        Ok(Some(context.render()))
    }

    /// The raw shared document.
    pub fn shared(&self) -> Result<SharedContext> {
        self.store.read_context()
    }
}
