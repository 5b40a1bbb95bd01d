//! Core data model shared by the coordinator and workers.
//!
//! Everything here is serialized to JSON in the workspace directory, so the
//! field names are the wire format and must stay stable across processes.

pub mod context;
pub mod result;
pub mod session;
pub mod task;

pub use context::{ContextEntry, SharedContext};
pub use result::{Artifact, ArtifactAction, ResultStatus, TaskResult};
pub use session::{Session, SessionStatus, TeamConfig, WorkerIdentity};
pub use task::{Task, TaskId, TaskStatus, WorkerRole};
