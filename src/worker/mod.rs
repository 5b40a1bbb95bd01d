//! Worker daemon.
//!
//! Each worker is an independent process polling the task directory for
//! work addressed to its identity. A claimed task is executed through the
//! agent CLI and always produces a result file, success or failure; a
//! worker that swallowed an error would leave its dependents blocked
//! forever.

pub mod prompt;
pub mod runner;

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::core::{Artifact, ResultStatus, Task, TaskResult, TaskStatus, WorkerRole};
use crate::error::Result;
use crate::schemas::task_result_schema;
use crate::store::FileStore;
use crate::{hlog, hlog_error};

use runner::{AgentRunner, RunRequest};

const TASK_MAX_TURNS: u32 = 10;

/// The structured payload a task execution is asked to produce.
#[derive(Debug, serde::Deserialize)]
struct TaskOutput {
    output: String,
    #[serde(default)]
    artifacts: Vec<Artifact>,
    #[serde(default)]
    context_contribution: String,
}

pub struct WorkerDaemon {
    name: String,
    role: WorkerRole,
    store: FileStore,
    runner: AgentRunner,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl WorkerDaemon {
    pub fn new(
        name: &str,
        role: WorkerRole,
        store: FileStore,
        runner: AgentRunner,
        poll_interval: Duration,
    ) -> Self {
        Self {
            name: name.to_string(),
            role,
            store,
            runner,
            poll_interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the poll loop when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Poll for work until cancelled.
    ///
    /// One task at a time: the loop claims the first assigned task it sees,
    /// runs it to completion, then resumes polling. Poll errors are logged
    /// and the loop keeps going.
    pub async fn run(&self) -> Result<()> {
        self.store.init()?;
        hlog!("worker {} ({}) started", self.name, self.role);
        println!("\n{} ({}) ready\n", self.name, self.role);

        let mut tick = tokio::time::interval(self.poll_interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tick.tick() => {
                    match self.claim_task() {
                        Ok(Some(task)) => {
                            if let Err(e) = self.execute_task(&task).await {
                                hlog_error!("task {} handling failed: {}", task.id, e);
                            }
                        }
                        Ok(None) => {}
                        Err(e) => hlog_error!("poll failed: {}", e),
                    }
                }
            }
        }

        hlog!("worker {} stopped", self.name);
        Ok(())
    }

    /// Find the first task assigned to this worker, if any.
    ///
    /// No cross-process locking exists; in the worst case two workers with
    /// the same name both run a task and the later result file wins.
    fn claim_task(&self) -> Result<Option<Task>> {
        let tasks = self.store.list_tasks()?;
        Ok(tasks
            .into_iter()
            .find(|t| t.assignee == self.name && t.status == TaskStatus::Assigned))
    }

    /// Execute one task and write its result file.
    ///
    /// Every path out of this function that can be reached after claiming
    /// writes a result, including executor spawn failures and unparseable
    /// output.
    async fn execute_task(&self, task: &Task) -> Result<()> {
        hlog!("executing task {}: {}", task.id, task.title);
        println!("Executing: {}", task.title);

        self.store.update_task_status(&task.id, TaskStatus::Running)?;
        let started = Instant::now();

        let shared_context = self.store.read_context()?;
        let directives = self.store.read_directives()?;
        let prompt_text = prompt::build_task_prompt(task, &shared_context, &directives);

        let outcome = self
            .runner
            .run(&RunRequest {
                prompt: prompt_text,
                system_prompt: Some(prompt::role_system_prompt(self.role).to_string()),
                json_schema: Some(task_result_schema()),
                max_turns: Some(TASK_MAX_TURNS),
                cwd: Some(self.store.working_directory().to_path_buf()),
            })
            .await;

        let duration_ms = started.elapsed().as_millis() as u64;
        let result = match outcome {
            Ok(outcome) if outcome.is_success() => {
                match runner::parse_structured::<TaskOutput>(&outcome.output) {
                    Ok(parsed) => TaskResult {
                        task_id: task.id.clone(),
                        status: ResultStatus::Success,
                        output: parsed.output,
                        artifacts: parsed.artifacts,
                        context_contribution: parsed.context_contribution,
                        cost_usd: runner::envelope_cost_usd(&outcome.output).unwrap_or(0.0),
                        duration_ms,
                    },
                    Err(e) => TaskResult::failure(
                        task.id.clone(),
                        &format!("unparseable task output: {}", e),
                        duration_ms,
                    ),
                }
            }
            Ok(outcome) => {
                let diagnostic = if outcome.output.is_empty() {
                    format!("agent exited with code {}", outcome.exit_code)
                } else {
                    outcome.output
                };
                TaskResult::failure(task.id.clone(), &diagnostic, duration_ms)
            }
            Err(e) => TaskResult::failure(task.id.clone(), &e.to_string(), duration_ms),
        };

        let succeeded = result.is_success();
        self.store.write_result(&result)?;
        if succeeded {
            hlog!("task {} completed", task.id);
            println!("Completed: {}", task.title);
        } else {
            hlog_error!("task {} failed: {}", task.id, result.output);
            println!("Failed: {}", task.title);
        }
        Ok(())
    }
}
