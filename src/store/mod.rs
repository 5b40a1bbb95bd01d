//! Durable workspace store.
//!
//! All inter-process communication in hive goes through JSON files under
//! `<working-dir>/.hive/`. The store owns that layout:
//!
//! ```text
//! .hive/
//!   tasks/<task-id>.json     one Task per file
//!   results/<task-id>.json   one TaskResult per file, written once
//!   context/shared.json      SharedContext, append-only
//!   directives.json          {"directives": [...]}
//!   session.json             Session metadata
//!   logs/                    per-process log files
//! ```
//!
//! Writes are atomic: serialize to a `.tmp-<uuid>.json` file in the target
//! directory, then rename into place. Rename is the atomicity boundary, so
//! a concurrent reader sees either the old or the new complete document,
//! never a partial one. A crash between temp-write and rename can leak a
//! temp file; listings and the watcher filter those out.

pub mod watcher;

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::core::{Session, SharedContext, Task, TaskId, TaskResult, TaskStatus};
use crate::error::{Error, Result};
use crate::{hlog_debug, hlog_trace};

/// Name of the workspace directory created under the working directory.
pub const WORKSPACE_DIR: &str = ".hive";

/// Prefix of in-flight atomic-write temp files.
pub const TEMP_PREFIX: &str = ".tmp-";

/// True for directory entries the store considers documents: `.json` files
/// that are not in-flight temp files.
pub fn is_document(name: &str) -> bool {
    name.ends_with(".json") && !name.starts_with(TEMP_PREFIX)
}

/// Typed, atomic persistence rooted at `<working-dir>/.hive`.
///
/// Cheap to clone; holds only paths.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    working_directory: PathBuf,
}

impl FileStore {
    pub fn new(working_directory: &Path) -> Self {
        Self {
            root: working_directory.join(WORKSPACE_DIR),
            working_directory: working_directory.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.root.join("tasks")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join("results")
    }

    pub fn context_dir(&self) -> PathBuf {
        self.root.join("context")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Create the workspace directories. Idempotent; fails only on
    /// non-recoverable filesystem errors.
    pub fn init(&self) -> Result<()> {
        hlog_debug!("FileStore::init root={}", self.root.display());
        for dir in [
            self.root.clone(),
            self.tasks_dir(),
            self.results_dir(),
            self.context_dir(),
            self.logs_dir(),
        ] {
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Remove the entire workspace directory.
    pub fn clean(&self) -> Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }

    // --- Tasks ---

    pub fn write_task(&self, task: &Task) -> Result<()> {
        let path = self.tasks_dir().join(format!("{}.json", task.id));
        self.write_json_atomic(&path, task)
    }

    pub fn read_task(&self, task_id: &TaskId) -> Result<Task> {
        let path = self.tasks_dir().join(format!("{}.json", task_id));
        self.read_json(&path)
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        self.list_json(&self.tasks_dir())
    }

    /// Read-modify-write of a task's status field.
    pub fn update_task_status(&self, task_id: &TaskId, status: TaskStatus) -> Result<()> {
        let mut task = self.read_task(task_id)?;
        task.status = status;
        self.write_task(&task)
    }

    // --- Results ---

    pub fn write_result(&self, result: &TaskResult) -> Result<()> {
        let path = self.results_dir().join(format!("{}.json", result.task_id));
        self.write_json_atomic(&path, result)
    }

    pub fn read_result(&self, task_id: &TaskId) -> Result<TaskResult> {
        let path = self.results_dir().join(format!("{}.json", task_id));
        self.read_json(&path)
    }

    pub fn list_results(&self) -> Result<Vec<TaskResult>> {
        self.list_json(&self.results_dir())
    }

    pub fn has_result(&self, task_id: &TaskId) -> bool {
        self.results_dir()
            .join(format!("{}.json", task_id))
            .exists()
    }

    // --- Shared context ---

    /// Read the shared context. Returns an empty context when the file does
    /// not exist yet (fresh-session bootstrap), not an error.
    pub fn read_context(&self) -> Result<SharedContext> {
        let path = self.context_dir().join("shared.json");
        if !path.exists() {
            return Ok(SharedContext::default());
        }
        self.read_json(&path)
    }

    pub fn append_context_entry(&self, entry: crate::core::ContextEntry) -> Result<()> {
        let mut ctx = self.read_context()?;
        ctx.entries.push(entry);
        let path = self.context_dir().join("shared.json");
        self.write_json_atomic(&path, &ctx)
    }

    // --- Directives ---

    pub fn write_directives(&self, directives: &[String]) -> Result<()> {
        let path = self.root.join("directives.json");
        self.write_json_atomic(&path, &DirectivesDoc {
            directives: directives.to_vec(),
        })
    }

    /// Read directives; empty list when none were ever written.
    pub fn read_directives(&self) -> Result<Vec<String>> {
        let path = self.root.join("directives.json");
        if !path.exists() {
            return Ok(Vec::new());
        }
        let doc: DirectivesDoc = self.read_json(&path)?;
        Ok(doc.directives)
    }

    // --- Session ---

    pub fn write_session(&self, session: &Session) -> Result<()> {
        let path = self.root.join("session.json");
        self.write_json_atomic(&path, session)
    }

    pub fn read_session(&self) -> Result<Session> {
        let path = self.root.join("session.json");
        self.read_json(&path)
    }

    // --- Project notes ---

    /// Read `CLAUDE.md` from the working directory, when present. Fed to
    /// the input classifier as project context.
    pub fn read_project_notes(&self) -> Option<String> {
        let path = self.working_directory.join("CLAUDE.md");
        fs::read_to_string(path).ok()
    }

    // --- Helpers ---

    fn write_json_atomic<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| Error::Store(format!("no parent directory for {}", path.display())))?;
        let tmp = dir.join(format!("{}{}.json", TEMP_PREFIX, Uuid::new_v4()));
        let serialized = serde_json::to_string_pretty(data)?;

        if let Err(err) = fs::write(&tmp, serialized).and_then(|_| fs::rename(&tmp, path)) {
            // Best-effort cleanup; a crash here leaks a temp file, which
            // is harmless and filtered out of listings.
            let _ = fs::remove_file(&tmp);
            return Err(Error::Store(format!(
                "failed to write {}: {}",
                path.display(),
                err
            )));
        }
        hlog_trace!("wrote {}", path.display());
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Store(format!("failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Store(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Enumerate all documents in a directory. Absent directory reads as
    /// empty (first-run tolerance).
    fn list_json<T: DeserializeOwned>(&self, dir: &Path) -> Result<Vec<T>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(Vec::new()),
        };

        let mut out = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_document(&name) {
                continue;
            }
            out.push(self.read_json(&entry.path())?);
        }
        Ok(out)
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct DirectivesDoc {
    directives: Vec<String>,
}
