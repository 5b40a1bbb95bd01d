//! Shared context accumulated across tasks.
//!
//! An append-only sequence of lessons contributed by completed tasks,
//! persisted as `context/shared.json` and replayed in full into every
//! future planning and execution prompt.

use serde::{Deserialize, Serialize};

use crate::core::task::TaskId;

/// One contributed lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Worker identity that contributed this entry.
    pub from: String,
    /// Task the entry originated from.
    pub task_id: TaskId,
    /// The lesson itself.
    pub summary: String,
}

/// The full shared context for a session. Grows monotonically; never pruned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SharedContext {
    #[serde(default)]
    pub entries: Vec<ContextEntry>,
}

impl SharedContext {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render entries as `[from] summary` lines for prompt inclusion.
    /// Empty string when there are no entries.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("[{}] {}", e.from, e.summary))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let ctx = SharedContext::default();
        assert!(ctx.is_empty());
        assert_eq!(ctx.render(), "");
    }

    #[test]
    fn test_render_lines() {
        let ctx = SharedContext {
            entries: vec![
                ContextEntry {
                    from: "investigator-1".to_string(),
                    task_id: TaskId::from("task-1"),
                    summary: "auth lives in src/auth.rs".to_string(),
                },
                ContextEntry {
                    from: "implementer-2".to_string(),
                    task_id: TaskId::from("task-2"),
                    summary: "added the login endpoint".to_string(),
                },
            ],
        };
        assert_eq!(
            ctx.render(),
            "[investigator-1] auth lives in src/auth.rs\n[implementer-2] added the login endpoint"
        );
    }

    #[test]
    fn test_deserialize_missing_entries() {
        let ctx: SharedContext = serde_json::from_str("{}").unwrap();
        assert!(ctx.is_empty());
    }
}
