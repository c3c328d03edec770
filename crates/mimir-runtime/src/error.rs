use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Result type for mimir-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer
#[derive(Debug)]
pub enum Error {
    /// Store layer error
    Index(mimir_index::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// A project file exists but does not have its expected structure
    MalformedInput { path: PathBuf, reason: String },

    /// Filesystem notification backend failed
    Watch(notify::Error),

    /// Configuration error
    Config(String),

    /// A background component did not stop within its deadline
    StopTimeout(Duration),

    /// A spawned task panicked or was aborted
    Join(tokio::task::JoinError),
}

impl Error {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Error::MalformedInput {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// The store was closed or never opened. Callers must not carry on.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Error::Index(mimir_index::Error::NotConnected))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Index(err) => write!(f, "Index error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::MalformedInput { path, reason } => {
                write!(f, "Malformed {}: {}", path.display(), reason)
            }
            Error::Watch(err) => write!(f, "Watch error: {}", err),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::StopTimeout(limit) => {
                write!(f, "Did not stop within {} ms", limit.as_millis())
            }
            Error::Join(err) => write!(f, "Task failed: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Index(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Watch(err) => Some(err),
            Error::Join(err) => Some(err),
            Error::MalformedInput { .. } | Error::Config(_) | Error::StopTimeout(_) => None,
        }
    }
}

impl From<mimir_index::Error> for Error {
    fn from(err: mimir_index::Error) -> Self {
        Error::Index(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<notify::Error> for Error {
    fn from(err: notify::Error) -> Self {
        Error::Watch(err)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Join(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
