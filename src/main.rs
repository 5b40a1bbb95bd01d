use std::path::PathBuf;

use clap::{Parser, Subcommand};

use hive::config::Config;
use hive::coordinator::Coordinator;
use hive::core::{Session, SessionStatus, TeamConfig};
use hive::tmux::{shell_escape, Tmux, SESSION_NAME};
use hive::worker::runner::AgentRunner;
use hive::worker::WorkerDaemon;
use hive::{hlog, hlog_error, Error, FileStore, Result};

/// Hive - file-coordinated multi-agent task orchestration
#[derive(Parser, Debug)]
#[command(name = "hive")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    HIVE_DEBUG=1    Enable debug logging")]
pub struct Cli {
    /// Enable debug logging (writes to .hive/logs/)
    #[arg(short = 'd', long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start a session: create the tmux layout and launch the team
    Start {
        /// Working directory for the session
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Number of investigator workers
        #[arg(long)]
        investigators: Option<usize>,

        /// Number of implementer workers
        #[arg(long)]
        implementers: Option<usize>,

        /// Number of tester workers
        #[arg(long)]
        testers: Option<usize>,
    },

    /// Stop the current session and tear down tmux
    Stop {
        #[arg(long)]
        cwd: Option<PathBuf>,
    },

    /// Show session and task status
    Status {
        #[arg(long)]
        cwd: Option<PathBuf>,
    },

    /// Remove the workspace directory and all its documents
    Clean {
        #[arg(long)]
        cwd: Option<PathBuf>,
    },

    /// Run the interactive coordinator (internal, spawned by start)
    Coordinator {
        #[arg(long)]
        cwd: Option<PathBuf>,

        #[arg(long)]
        investigators: Option<usize>,

        #[arg(long)]
        implementers: Option<usize>,

        #[arg(long)]
        testers: Option<usize>,
    },

    /// Run a worker daemon (internal, spawned by start)
    Worker {
        /// Worker identity, e.g. investigator-1
        #[arg(long)]
        name: String,

        /// Worker role: investigator, implementer, or tester
        #[arg(long)]
        role: String,

        #[arg(long)]
        cwd: Option<PathBuf>,
    },
}

fn effective_cwd(cwd: Option<PathBuf>) -> Result<PathBuf> {
    match cwd {
        Some(path) => Ok(path),
        None => Ok(std::env::current_dir()?),
    }
}

fn team_from_flags(
    config: &Config,
    investigators: Option<usize>,
    implementers: Option<usize>,
    testers: Option<usize>,
) -> TeamConfig {
    let default = TeamConfig::default();
    TeamConfig {
        investigators: investigators
            .or(config.investigators)
            .unwrap_or(default.investigators),
        implementers: implementers
            .or(config.implementers)
            .unwrap_or(default.implementers),
        testers: testers.or(config.testers).unwrap_or(default.testers),
    }
}

fn runner_from_config(config: &Config) -> Result<AgentRunner> {
    AgentRunner::new(config.effective_command())
}

fn cmd_start(cwd: PathBuf, team: TeamConfig) -> Result<()> {
    if !Tmux::is_available() {
        return Err(Error::Tmux(
            "tmux is not installed or not on PATH".to_string(),
        ));
    }

    let store = FileStore::new(&cwd);
    store.init()?;
    let session = Session::new(cwd.clone(), team);
    store.write_session(&session)?;
    hlog!("session {} starting with team {:?}", session.id, team);

    Tmux::create_session(SESSION_NAME, &cwd, &team)?;

    let bin = std::env::current_exe()?;
    let bin = shell_escape(&bin.display().to_string());
    let cwd_arg = shell_escape(&cwd.display().to_string());

    for (pane, name) in Tmux::pane_names(&team).iter().enumerate() {
        let command = if name == "coordinator" {
            format!(
                "{} coordinator --cwd {} --investigators {} --implementers {} --testers {}",
                bin, cwd_arg, team.investigators, team.implementers, team.testers
            )
        } else {
            // role is the identity without the trailing index
            let role = name.rsplit_once('-').map(|(r, _)| r).unwrap_or(name);
            format!(
                "{} worker --name {} --role {} --cwd {}",
                bin,
                shell_escape(name),
                role,
                cwd_arg
            )
        };
        Tmux::send_command(SESSION_NAME, pane, &command)?;
    }

    println!("Session started. Attaching...");
    Tmux::attach(SESSION_NAME)
}

fn cmd_stop(cwd: PathBuf) -> Result<()> {
    Tmux::kill_session(SESSION_NAME)?;

    let store = FileStore::new(&cwd);
    if let Ok(mut session) = store.read_session() {
        session.status = SessionStatus::Stopped;
        store.write_session(&session)?;
    }
    println!("Session stopped.");
    Ok(())
}

fn cmd_status(cwd: PathBuf) -> Result<()> {
    let store = FileStore::new(&cwd);
    let session = match store.read_session() {
        Ok(session) => session,
        Err(_) => {
            println!("No active session found.");
            return Ok(());
        }
    };

    println!("Session: {}", session.id);
    println!("Started: {}", session.started_at);
    println!("Status: {}", session.status);
    println!(
        "Team: {} investigators, {} implementers, {} testers",
        session.team.investigators, session.team.implementers, session.team.testers
    );

    let tasks = store.list_tasks()?;
    println!("Tasks: {}", tasks.len());
    for task in &tasks {
        println!("  [{}] {}: {}", task.status, task.assignee, task.title);
    }
    Ok(())
}

fn cmd_clean(cwd: PathBuf) -> Result<()> {
    let store = FileStore::new(&cwd);
    store.clean()?;
    println!("Workspace removed.");
    Ok(())
}

async fn cmd_coordinator(cwd: PathBuf, team: TeamConfig, config: &Config) -> Result<()> {
    let runner = runner_from_config(config)?;
    let tmux_session = Tmux::session_exists(SESSION_NAME).then(|| SESSION_NAME.to_string());
    let mut coordinator =
        Coordinator::new(cwd, team, runner, tmux_session, config.poll_interval());
    coordinator.run().await
}

async fn cmd_worker(cwd: PathBuf, name: &str, role: &str, config: &Config) -> Result<()> {
    let role = role.parse().map_err(Error::Validation)?;
    let store = FileStore::new(&cwd);
    let runner = runner_from_config(config)?;
    let daemon = WorkerDaemon::new(name, role, store, runner, config.poll_interval());

    let token = daemon.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    daemon.run().await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    // Logs live inside the session workspace, named after the process
    let log_cwd = match &cli.command {
        Command::Start { cwd, .. }
        | Command::Stop { cwd }
        | Command::Status { cwd }
        | Command::Clean { cwd }
        | Command::Coordinator { cwd, .. }
        | Command::Worker { cwd, .. } => cwd.clone(),
    };
    let log_name = match &cli.command {
        Command::Coordinator { .. } => "coordinator".to_string(),
        Command::Worker { name, .. } => name.clone(),
        _ => "cli".to_string(),
    };
    if let Ok(cwd) = effective_cwd(log_cwd) {
        hive::log::init(&FileStore::new(&cwd).logs_dir(), &log_name, cli.debug);
    }

    let result = match cli.command {
        Command::Start {
            cwd,
            investigators,
            implementers,
            testers,
        } => effective_cwd(cwd).and_then(|cwd| {
            let team = team_from_flags(&config, investigators, implementers, testers);
            cmd_start(cwd, team)
        }),
        Command::Stop { cwd } => effective_cwd(cwd).and_then(cmd_stop),
        Command::Status { cwd } => effective_cwd(cwd).and_then(cmd_status),
        Command::Clean { cwd } => effective_cwd(cwd).and_then(cmd_clean),
        Command::Coordinator {
            cwd,
            investigators,
            implementers,
            testers,
        } => match effective_cwd(cwd) {
            Ok(cwd) => {
                let team = team_from_flags(&config, investigators, implementers, testers);
                cmd_coordinator(cwd, team, &config).await
            }
            Err(e) => Err(e),
        },
        Command::Worker { name, role, cwd } => match effective_cwd(cwd) {
            Ok(cwd) => cmd_worker(cwd, &name, &role, &config).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        hlog_error!("fatal: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
