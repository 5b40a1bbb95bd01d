//! Session metadata and team sizing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::task::WorkerRole;

/// How many workers of each role a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamConfig {
    pub investigators: usize,
    pub implementers: usize,
    pub testers: usize,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            investigators: 2,
            implementers: 2,
            testers: 1,
        }
    }
}

impl TeamConfig {
    /// Worker pool size for a role. At least 1, so round-robin assignment
    /// never divides by zero even for a role sized to 0.
    pub fn capacity(&self, role: WorkerRole) -> usize {
        let n = match role {
            WorkerRole::Investigator => self.investigators,
            WorkerRole::Implementer => self.implementers,
            WorkerRole::Tester => self.testers,
        };
        n.max(1)
    }

    pub fn total(&self) -> usize {
        self.investigators + self.implementers + self.testers
    }

    /// All worker identities this team runs, in role order.
    pub fn worker_identities(&self) -> Vec<WorkerIdentity> {
        let mut out = Vec::with_capacity(self.total());
        for role in WorkerRole::ALL {
            let count = match role {
                WorkerRole::Investigator => self.investigators,
                WorkerRole::Implementer => self.implementers,
                WorkerRole::Tester => self.testers,
            };
            for i in 1..=count {
                out.push(WorkerIdentity::new(role, i));
            }
        }
        out
    }
}

/// A specific worker process identity, e.g. `investigator-1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerIdentity {
    pub role: WorkerRole,
    pub name: String,
}

impl WorkerIdentity {
    pub fn new(role: WorkerRole, index: usize) -> Self {
        Self {
            role,
            name: format!("{}-{}", role.as_str(), index),
        }
    }
}

impl std::fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Session lifecycle flag. `stopped` is set once by the stop path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Stopped,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Session-scoped metadata, written once to `session.json` at start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub working_directory: PathBuf,
    pub team: TeamConfig,
    pub status: SessionStatus,
}

impl Session {
    pub fn new(working_directory: PathBuf, team: TeamConfig) -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        Self {
            id: format!("session-{}", &uuid[..8]),
            started_at: Utc::now(),
            working_directory,
            team,
            status: SessionStatus::Active,
        }
    }
}
