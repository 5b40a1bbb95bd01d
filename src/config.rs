use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::{hlog_debug, Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Agent CLI to invoke, defaults to `claude`.
    pub command: Option<String>,
    /// Workspace poll interval in milliseconds.
    pub poll_interval_ms: Option<u64>,
    /// Default team sizes for `hive start`.
    pub investigators: Option<usize>,
    pub implementers: Option<usize>,
    pub testers: Option<usize>,
}

impl Config {
    pub fn hive_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".hive"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::hive_dir()?.join("config.toml"))
    }

    pub fn effective_command(&self) -> &str {
        self.command.as_deref().unwrap_or("claude")
    }

    /// Workspace poll interval, used by both the coordinator watcher and
    /// the worker claim loop.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(crate::store::watcher::DEFAULT_POLL_INTERVAL)
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        hlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            hlog_debug!("config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(&path)?)?;
        hlog_debug!(
            "config loaded: command={:?} poll_interval_ms={:?}",
            config.command,
            config.poll_interval_ms
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let hive_dir = Self::hive_dir()?;
        if !hive_dir.exists() {
            fs::create_dir_all(&hive_dir)?;
        }
        let path = Self::config_path()?;
        fs::write(&path, toml::to_string_pretty(self)?)?;
        hlog_debug!("config saved to {}", path.display());
        Ok(())
    }
}
