//! Interactive coordinator.
//!
//! Reads operator input from stdin, decomposes work requests into tasks,
//! and reacts to result files appearing in the workspace. All worker
//! communication happens through the file store; the coordinator never
//! talks to a worker process directly.

pub mod classifier;
pub mod compliance;
pub mod context;
pub mod planner;
pub mod scheduler;

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::core::{ResultStatus, SessionStatus, Task, TaskStatus, TeamConfig};
use crate::error::Result;
use crate::store::watcher::Watcher;
use crate::store::FileStore;
use crate::tmux::Tmux;
use crate::worker::runner::AgentRunner;
use crate::{hlog, hlog_error, hlog_warn};

use classifier::{ClassificationTarget, InputClassifier};
use compliance::ComplianceChecker;
use context::ContextManager;
use planner::TaskPlanner;
use scheduler::TaskScheduler;

/// What the input loop should do after handling one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Routed {
    Continue,
    Shutdown,
}

pub struct Coordinator {
    store: FileStore,
    scheduler: TaskScheduler,
    planner: TaskPlanner,
    context: ContextManager,
    compliance: ComplianceChecker,
    classifier: InputClassifier,
    team: TeamConfig,
    cwd: PathBuf,
    tasks: Vec<Task>,
    directives: Vec<String>,
    /// Session to tear down on quit, when the coordinator runs inside tmux.
    tmux_session: Option<String>,
    /// How often the results directory is scanned for new files.
    poll_interval: Duration,
}

impl Coordinator {
    pub fn new(
        cwd: PathBuf,
        team: TeamConfig,
        runner: AgentRunner,
        tmux_session: Option<String>,
        poll_interval: Duration,
    ) -> Self {
        let store = FileStore::new(&cwd);
        Self {
            scheduler: TaskScheduler::new(store.clone()),
            planner: TaskPlanner::new(runner.clone()),
            context: ContextManager::new(store.clone()),
            compliance: ComplianceChecker::new(runner.clone()),
            classifier: InputClassifier::new(runner),
            store,
            team,
            cwd,
            tasks: Vec::new(),
            directives: Vec::new(),
            tmux_session,
            poll_interval,
        }
    }

    /// Run the interactive loop until the operator quits or stdin closes.
    pub async fn run(&mut self) -> Result<()> {
        self.store.init()?;
        self.directives = self.store.read_directives()?;

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let mut watcher = Watcher::new();
        watcher.watch(self.store.results_dir(), self.poll_interval, move |name| {
            let _ = tx.send(name.to_string());
        });

        hlog!("coordinator started in {}", self.cwd.display());
        println!("\nhive coordinator");
        println!("Type a request and press Enter. /help lists commands.\n");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            let input = line.trim();
                            if input.is_empty() {
                                continue;
                            }
                            match self.route_input(input).await {
                                Ok(Routed::Shutdown) => break,
                                Ok(Routed::Continue) => {}
                                Err(e) => {
                                    hlog_error!("failed to handle input: {}", e);
                                    println!("Error: {}", e);
                                }
                            }
                        }
                        // stdin closed, treat like quit
                        Ok(None) => break,
                        Err(e) => {
                            hlog_error!("stdin read failed: {}", e);
                            break;
                        }
                    }
                }
                Some(filename) = rx.recv() => {
                    if let Err(e) = self.handle_result_file(&filename).await {
                        hlog_error!("failed to handle result {}: {}", filename, e);
                    }
                }
            }
        }

        watcher.stop();
        self.shutdown();
        Ok(())
    }

    /// Route one line of operator input.
    ///
    /// A `/` prefix selects a fixed command, or appends the body as a
    /// standing directive when it matches none. The bare words `status`,
    /// `quit`, and `exit` keep working without the slash. Everything else
    /// goes to classification and, for work requests, decomposition.
    async fn route_input(&mut self, input: &str) -> Result<Routed> {
        if let Some(body) = input.strip_prefix('/') {
            match body.to_lowercase().as_str() {
                "status" => self.print_status(),
                "quit" | "exit" => return Ok(Routed::Shutdown),
                "help" => self.print_help(),
                "directives" => self.print_directives(),
                _ => {
                    self.directives.push(body.to_string());
                    self.store.write_directives(&self.directives)?;
                    hlog!("directive added: {}", body);
                    println!("Directive added: {}", body);
                }
            }
            return Ok(Routed::Continue);
        }

        match input {
            "status" => {
                self.print_status();
                return Ok(Routed::Continue);
            }
            "quit" | "exit" => return Ok(Routed::Shutdown),
            _ => {}
        }

        let context_summary = self.context.summary()?;
        let project_notes = self.store.read_project_notes();
        let classification = self
            .classifier
            .classify(
                input,
                context_summary.as_deref(),
                project_notes.as_deref(),
                Some(self.cwd.clone()),
            )
            .await;
        if classification.target == ClassificationTarget::Coordinator {
            println!("\n{}\n", classification.response);
            return Ok(Routed::Continue);
        }

        self.handle_request(input, context_summary).await?;
        Ok(Routed::Continue)
    }

    /// Decompose a work request and dispatch the resulting tasks.
    async fn handle_request(
        &mut self,
        request: &str,
        context_summary: Option<String>,
    ) -> Result<()> {
        hlog!("processing request: {}", request);
        println!("\nPlanning tasks...\n");

        let plan = self
            .planner
            .plan_tasks(
                request,
                context_summary.as_deref(),
                &self.directives,
                Some(self.cwd.clone()),
            )
            .await?;

        println!("Plan: {}", plan.summary);
        for planned in &plan.tasks {
            println!("  [{}] {}", planned.role, planned.title);
        }
        println!();

        let tasks = self.planner.assign_tasks(&plan, &self.team);
        self.scheduler.write_tasks(&tasks)?;
        hlog!("dispatched {} tasks", tasks.len());
        self.tasks = tasks;
        Ok(())
    }

    /// React to a result file appearing in the results directory.
    ///
    /// Results for tasks outside the current batch (stale batches, manual
    /// writes) are ignored.
    async fn handle_result_file(&mut self, filename: &str) -> Result<()> {
        let task_id = crate::core::TaskId::from(filename.trim_end_matches(".json"));
        let result = self.store.read_result(&task_id)?;

        let Some(position) = self.tasks.iter().position(|t| t.id == task_id) else {
            return Ok(());
        };

        let status = match result.status {
            ResultStatus::Success => TaskStatus::Success,
            ResultStatus::Failure => TaskStatus::Failure,
        };
        self.tasks[position].status = status;
        self.store.write_task(&self.tasks[position])?;

        let task = self.tasks[position].clone();
        self.context.absorb_result(&task, &result)?;

        if ComplianceChecker::should_check(&result, &self.directives) {
            let verdict = self
                .compliance
                .check(&task, &result, &self.directives, Some(self.cwd.clone()))
                .await;
            if let Some(verdict) = verdict {
                if !verdict.compliant {
                    hlog_warn!("task {} violates directives: {}", task.id, verdict.summary);
                    println!("\nCompliance warning for \"{}\": {}", task.title, verdict.summary);
                    for violation in &verdict.violations {
                        println!("  - \"{}\": {}", violation.directive, violation.reason);
                    }
                }
            }
        }

        hlog!("task {} finished ({}): {}", task.id, status, task.title);
        println!("[{}] {} ({})", task.assignee, task.title, status);

        let unblocked = self.scheduler.resolve_dependencies(&mut self.tasks)?;
        if !unblocked.is_empty() {
            hlog!("unblocked {} tasks", unblocked.len());
        }

        if self.scheduler.is_all_complete(&self.tasks) {
            println!("\nAll tasks completed.\n");
            self.print_status();
        }
        Ok(())
    }

    fn print_status(&self) {
        if self.tasks.is_empty() {
            println!("No active tasks.");
            return;
        }
        println!("\n--- Task Status ---");
        for task in &self.tasks {
            println!("  [{}] {} ({})", task.assignee, task.title, task.status);
        }
        let summary = self.scheduler.status_summary(&self.tasks);
        let rendered: Vec<String> = summary
            .iter()
            .map(|(status, count)| format!("{}: {}", status, count))
            .collect();
        println!("\nTotal: {}\n", rendered.join(", "));
    }

    fn print_help(&self) {
        println!("\n--- Commands ---");
        println!("  /status      Show current task status");
        println!("  /quit        Shut down the session");
        println!("  /exit        Shut down the session");
        println!("  /help        Show this help");
        println!("  /directives  List current directives");
        println!("  /<text>      Add a standing directive");
        println!();
        println!("Any other input is treated as a question or a task request.\n");
    }

    fn print_directives(&self) {
        if self.directives.is_empty() {
            println!("No directives set.");
            return;
        }
        println!("\n--- Directives ---");
        for directive in &self.directives {
            println!("  - {}", directive);
        }
        println!();
    }

    fn shutdown(&self) {
        hlog!("coordinator shutting down");
        // A stale active session record would make later status queries
        // report a session that no longer runs.
        if let Ok(mut session) = self.store.read_session() {
            if session.status == SessionStatus::Active {
                session.status = SessionStatus::Stopped;
                if let Err(e) = self.store.write_session(&session) {
                    hlog_warn!("could not mark session stopped: {}", e);
                }
            }
        }
        if let Some(name) = &self.tmux_session {
            if let Err(e) = Tmux::kill_session(name) {
                hlog_warn!("could not kill tmux session '{}': {}", name, e);
            }
        }
    }
}
