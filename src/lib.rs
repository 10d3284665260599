//! Reversible deletion for a single-user machine.
//!
//! Deleted paths are moved into a managed repository and tracked in a
//! metadata store, from where they can be restored, searched, or purged on
//! demand or after a retention period. [`LifecycleEngine`] owns every
//! mutation; [`QueryEngine`] only reads.

pub mod audit;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod helpers;
pub mod id;
pub mod lock;
pub mod models;
pub mod query;
pub mod repository;
pub mod store;
pub mod sweeper;

pub use audit::{AuditAction, AuditLog};
pub use config::{Config, TrashPaths};
pub use engine::LifecycleEngine;
pub use errors::{CoreError, ErrorCategory, Result};
pub use fs::{FileSystem, RealFileSystem};
pub use helpers::{
    build_conflict_name,
    format_timestamp,
    is_affirmative,
    normalize_date_bound,
    print_size,
    retention_cutoff,
    sanitize_user_path,
    TIMESTAMP_FORMAT,
};
pub use models::{
    ConflictChoice,
    DeleteOutcome,
    DeleteReport,
    ExitStatusLike,
    ItemKind,
    PurgeScope,
    PurgeSummary,
    RestoreMatch,
    RestoreOutcome,
    SkipReason,
    SortKey,
    SweepReport,
    TrashRecord,
};
pub use query::{
    ConsistencyReport,
    ListResult,
    Listing,
    Preview,
    QueryEngine,
    SearchCriteria,
    SearchMiss,
    SearchResult,
    Statistics,
};
pub use sweeper::{BackgroundSweep, SweepHandle};

/// Re-export a small stable API surface for the command crate.
pub mod prelude {
    pub use crate::{
        config::{Config, TrashPaths},
        engine::LifecycleEngine,
        errors::{CoreError, Result},
        fs::{FileSystem, RealFileSystem},
        helpers::*,
        models::*,
        query::*,
    };
}
