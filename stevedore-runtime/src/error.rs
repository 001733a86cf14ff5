use std::fmt;

/// Errors returned by daemon runtime operations.
#[derive(Debug)]
pub enum DaemonError {
    /// Invalid client input (e.g. a malformed platform filter).
    Validation(String),
    /// Requested image does not exist in the active namespace.
    NotFound(String),
    /// Image store lookup failure.
    Storage(String),
    /// Container-runtime backend failure.
    Docker(String),
    /// Archive construction or streaming failure.
    Export(String),
}

impl DaemonError {
    /// True only for the zero-match resolution outcome. The HTTP layer maps
    /// this to 404 and treats every other variant as an opaque 500.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DaemonError::NotFound(_))
    }
}

impl fmt::Display for DaemonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonError::Validation(msg) => write!(f, "validation error: {msg}"),
            DaemonError::NotFound(msg) => write!(f, "not found: {msg}"),
            DaemonError::Storage(msg) => write!(f, "storage error: {msg}"),
            DaemonError::Docker(msg) => write!(f, "docker error: {msg}"),
            DaemonError::Export(msg) => write!(f, "export error: {msg}"),
        }
    }
}

impl std::error::Error for DaemonError {}

pub type Result<T> = std::result::Result<T, DaemonError>;
