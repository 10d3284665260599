use std::{io, path::PathBuf};

/// Shared error type for every recycle bin operation.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    /// File system I/O failure.
    #[error("I/O error while accessing {0}")]
    Io(PathBuf, #[source] io::Error),

    /// A path is invalid for the current operation.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A required input is missing.
    #[error("missing required value: {0}")]
    MissingValue(String),

    /// An operation was rejected due to configuration/argument issues.
    #[error("invalid command input: {0}")]
    InvalidInput(String),

    /// No record matched the requested id or pattern.
    #[error("not found: {0}")]
    NotFound(String),

    /// A record exists but its payload is gone from the repository.
    #[error("payload missing for {id} (expected at {path})")]
    MissingPayload { id: String, path: PathBuf },

    /// The caller may not read the source or write its parent.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// A conflict prevented the operation from proceeding.
    #[error("resource conflict: {0}")]
    Conflict(String),

    /// A store row could not be decoded.
    #[error("corrupt record on line {line}: {reason}")]
    CorruptRecord { line: usize, reason: String },
}

/// Coarse classification used by callers for rendering and exit codes.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorCategory {
    UserInput,
    NotFound,
    Permission,
    Conflict,
    Io,
}

impl CoreError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::InvalidPath(message.into())
    }

    pub fn missing(message: impl Into<String>) -> Self {
        Self::MissingValue(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, error: io::Error) -> Self {
        Self::Io(path.into(), error)
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidPath(_) | Self::MissingValue(_) | Self::InvalidInput(_) => ErrorCategory::UserInput,
            Self::NotFound(_) | Self::MissingPayload { .. } => ErrorCategory::NotFound,
            Self::PermissionDenied(_) => ErrorCategory::Permission,
            Self::Conflict(_) => ErrorCategory::Conflict,
            Self::Io(..) | Self::CorruptRecord { .. } => ErrorCategory::Io,
        }
    }
}

/// Shared result alias for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
