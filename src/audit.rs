//! Append-only audit log: `<timestamp> [<ACTION>] <summary>` per line.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::TrashPaths;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::helpers::format_timestamp;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AuditAction {
    Delete,
    Restore,
    Empty,
    AutoClean,
    Search,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Restore => "RESTORE",
            Self::Empty => "EMPTY",
            Self::AutoClean => "AUTO_CLEAN",
            Self::Search => "SEARCH",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub struct AuditLog {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl AuditLog {
    pub fn new(fs: Arc<dyn FileSystem>, paths: &TrashPaths) -> Self {
        Self {
            fs,
            path: paths.log_file.clone(),
        }
    }

    pub fn record(&self, action: AuditAction, summary: &str) -> Result<()> {
        let line = format!("{} [{}] {}", format_timestamp(self.fs.now()), action, summary);
        self.fs.append_line(&self.path, &line)
    }

    /// Logging must never turn a completed transition into a failure.
    pub fn record_quietly(&self, action: AuditAction, summary: &str) {
        if let Err(err) = self.record(action, summary) {
            tracing::warn!(action = %action, error = %err, "failed to write audit log");
        }
    }
}
