use crate::watcher::WatcherConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "mimir.toml";

/// Resolve the data directory based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. MIMIR_PATH environment variable (with tilde expansion)
/// 3. XDG data directory
/// 4. ~/.mimir
pub fn resolve_data_dir(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("MIMIR_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("mimir"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".mimir"));
    }

    Err(Error::Config(
        "Could not determine data directory: no HOME directory or XDG data directory found"
            .to_string(),
    ))
}

/// Expand tilde (~) in paths to the user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

fn expand_path(path: &Path, base: Option<&Path>) -> PathBuf {
    let expanded = match path.to_str() {
        Some(raw) => expand_tilde(raw),
        None => path.to_path_buf(),
    };
    match base {
        Some(base) if expanded.is_relative() => base.join(expanded),
        _ => expanded,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories scanned for project roots and watched for changes.
    pub watch_paths: Vec<PathBuf>,
    /// Deepest directory level (below each watch path) that can be a project root.
    pub max_depth: usize,
    /// Store location. Defaults to `mimir.db` in the data directory.
    pub db_path: Option<PathBuf>,
    /// Coalescing window for repeated writes to the same file.
    pub debounce_ms: u64,
    /// Events buffered per live subscriber before it is disconnected.
    pub subscriber_capacity: usize,
    /// Upper bound on how long stopping the watcher may take.
    pub stop_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_paths: Vec::new(),
            max_depth: 3,
            db_path: None,
            debounce_ms: 300,
            subscriber_capacity: 100,
            stop_timeout_ms: 5_000,
        }
    }
}

impl Config {
    /// Load the nearest `mimir.toml` at or above the working directory, or
    /// defaults when there is none.
    pub fn discover() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        match find_config_file(&cwd) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Relative paths in the file are taken relative to the file's directory.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = path.parent();
        config.watch_paths = config
            .watch_paths
            .iter()
            .map(|p| expand_path(p, base))
            .collect();
        config.db_path = config.db_path.as_deref().map(|p| expand_path(p, base));

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => Ok(resolve_data_dir(None)?.join("mimir.db")),
        }
    }

    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            stop_timeout: self.stop_timeout(),
        }
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// Walk upward from `start` looking for `mimir.toml`.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}
