use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Task planning error: {0}")]
    Planning(String),

    #[error("Agent executor error: {0}")]
    Executor(String),

    #[error("Tmux error: {0}")]
    Tmux(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Agent binary not found in PATH")]
    AgentBinaryNotFound,

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, Error>;
