//! Thin shell over the tmux CLI.
//!
//! One tmux session hosts the whole team: pane 0 runs the interactive
//! coordinator and every worker daemon gets its own pane. Pane geometry is
//! left to tmux's tiled layout; only pane order is guaranteed, matching
//! `pane_names`.

use std::path::Path;
use std::process::Command;

use crate::core::TeamConfig;
use crate::error::{Error, Result};
use crate::{hlog_debug, hlog_warn};

pub const SESSION_NAME: &str = "hive";

pub struct Tmux;

impl Tmux {
    pub fn is_available() -> bool {
        Command::new("tmux")
            .arg("-V")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    pub fn session_exists(name: &str) -> bool {
        Command::new("tmux")
            .args(["has-session", "-t", name])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Create a detached session with one pane per team member.
    ///
    /// Pane 0 is the coordinator; workers follow in `pane_names` order. The
    /// tiled layout is reapplied after every split so tmux never runs out of
    /// room for the next one.
    pub fn create_session(name: &str, cwd: &Path, team: &TeamConfig) -> Result<()> {
        if Self::session_exists(name) {
            return Err(Error::Tmux(format!(
                "session '{}' already exists, stop it first",
                name
            )));
        }

        let cwd_str = cwd.display().to_string();
        hlog_debug!(
            "Tmux::create_session name={} cwd={} panes={}",
            name,
            cwd_str,
            1 + team.total()
        );

        run_tmux(&[
            "new-session", "-d", "-s", name, "-x", "200", "-y", "50", "-c", &cwd_str,
        ])?;
        run_tmux(&["rename-window", "-t", name, name])?;

        for _ in 0..team.total() {
            run_tmux(&["split-window", "-t", name, "-c", &cwd_str])?;
            run_tmux(&["select-layout", "-t", name, "tiled"])?;
        }

        run_tmux(&["select-pane", "-t", &format!("{}:0.0", name)])?;
        Ok(())
    }

    /// Type a shell command into one pane and press Enter.
    pub fn send_command(name: &str, pane: usize, command: &str) -> Result<()> {
        hlog_debug!("Tmux::send_command pane={} cmd={}", pane, command);
        run_tmux(&[
            "send-keys",
            "-t",
            &format!("{}:0.{}", name, pane),
            command,
            "Enter",
        ])
    }

    pub fn kill_session(name: &str) -> Result<()> {
        hlog_debug!("Tmux::kill_session name={}", name);
        let output = Command::new("tmux")
            .args(["kill-session", "-t", name])
            .output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.contains("session not found") && !stderr.contains("no server running") {
                hlog_warn!("failed to kill tmux session '{}': {}", name, stderr);
                return Err(Error::Tmux(format!(
                    "failed to kill session '{}': {}",
                    name,
                    stderr.trim()
                )));
            }
            hlog_debug!("tmux session '{}' already gone", name);
        }
        Ok(())
    }

    /// Attach the calling terminal to the session. Blocks until detach.
    pub fn attach(name: &str) -> Result<()> {
        hlog_debug!("Tmux::attach name={}", name);
        let status = Command::new("tmux")
            .args(["attach-session", "-t", name])
            .status()?;
        if !status.success() {
            return Err(Error::Tmux(format!(
                "failed to attach to session '{}'",
                name
            )));
        }
        Ok(())
    }

    /// Pane occupants in pane-index order: coordinator first, then workers.
    pub fn pane_names(team: &TeamConfig) -> Vec<String> {
        let mut names = vec!["coordinator".to_string()];
        names.extend(team.worker_identities().iter().map(|w| w.to_string()));
        names
    }
}

fn run_tmux(args: &[&str]) -> Result<()> {
    let output = Command::new("tmux").args(args).output()?;
    if !output.status.success() {
        return Err(Error::Tmux(format!(
            "tmux {} failed: {}",
            args.first().copied().unwrap_or(""),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

/// Quote a string for embedding in a pane command line.
pub fn shell_escape(s: &str) -> String {
    if s.chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.' || c == '/')
    {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\"'\"'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_escape() {
        assert_eq!(shell_escape("hello"), "hello");
        assert_eq!(shell_escape("/usr/bin/hive"), "/usr/bin/hive");
        assert_eq!(shell_escape("hello world"), "'hello world'");
        assert_eq!(shell_escape("it's"), "'it'\"'\"'s'");
    }

    #[test]
    fn test_pane_names_order() {
        let team = TeamConfig {
            investigators: 2,
            implementers: 1,
            testers: 1,
        };
        assert_eq!(
            Tmux::pane_names(&team),
            vec![
                "coordinator",
                "investigator-1",
                "investigator-2",
                "implementer-1",
                "tester-1"
            ]
        );
    }
}
