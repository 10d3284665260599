use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::CoreError;

/// Kind of payload held under a trash id.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ItemKind {
    File,
    Directory,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "file" => Ok(Self::File),
            "directory" => Ok(Self::Directory),
            other => Err(CoreError::invalid_input(format!("unknown item kind: {other}"))),
        }
    }
}

/// One metadata row describing a single trashed item.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TrashRecord {
    pub id: String,
    pub original_name: String,
    pub original_dir: String,
    /// `YYYY-MM-DD HH:MM:SS`, compared as a string.
    pub deleted_at: String,
    /// Directory entries record their own size, not the size of their contents.
    pub size_bytes: u64,
    pub kind: ItemKind,
    pub mode: u32,
    /// `user:group`
    pub owner: String,
}

impl TrashRecord {
    pub fn original_path(&self) -> PathBuf {
        PathBuf::from(&self.original_dir).join(&self.original_name)
    }

    pub fn is_file(&self) -> bool {
        self.kind == ItemKind::File
    }
}

/// Policy applied when a restore destination is already occupied.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConflictChoice {
    Overwrite,
    Rename,
    Cancel,
}

impl FromStr for ConflictChoice {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "overwrite" | "o" => Ok(Self::Overwrite),
            "rename" | "r" => Ok(Self::Rename),
            "cancel" | "c" => Ok(Self::Cancel),
            other => Err(CoreError::invalid_input(format!("unknown conflict choice: {other}"))),
        }
    }
}

/// Which records a purge targets.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PurgeScope {
    All,
    Id(String),
    /// Case-insensitive substring over every field.
    Pattern(String),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum SortKey {
    #[default]
    None,
    Name,
    Date,
    Size,
}

impl FromStr for SortKey {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "name" => Ok(Self::Name),
            "date" => Ok(Self::Date),
            "size" => Ok(Self::Size),
            other => Err(CoreError::invalid_input(format!(
                "invalid sort key '{other}' (expected name, date or size)"
            ))),
        }
    }
}

/// Why a single path was not moved to the trash.
#[derive(Debug)]
pub enum SkipReason {
    MissingPath(PathBuf),
    InsideTrash(PathBuf),
    ContainsTrash(PathBuf),
    PermissionDenied(PathBuf),
    UnsupportedName(PathBuf),
    Failed(CoreError),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPath(path) => write!(f, "{} does not exist", path.display()),
            Self::InsideTrash(path) => write!(f, "refusing to delete {} inside the recycle bin", path.display()),
            Self::ContainsTrash(path) => write!(f, "refusing to delete {}, it contains the recycle bin", path.display()),
            Self::PermissionDenied(path) => write!(f, "permission denied for {}", path.display()),
            Self::UnsupportedName(path) => {
                write!(f, "{} contains a comma or line break, which the store cannot hold", path.display())
            }
            Self::Failed(err) => write!(f, "{err}"),
        }
    }
}

/// Result of trashing one path.
#[derive(Debug)]
pub enum DeleteOutcome {
    Trashed(TrashRecord),
    Skipped { path: PathBuf, reason: SkipReason },
}

/// Per-path results of a delete, in request order.
#[derive(Debug, Default)]
pub struct DeleteReport {
    pub outcomes: Vec<DeleteOutcome>,
}

impl DeleteReport {
    pub fn trashed(&self) -> impl Iterator<Item = &TrashRecord> {
        self.outcomes.iter().filter_map(|o| match o {
            DeleteOutcome::Trashed(record) => Some(record),
            DeleteOutcome::Skipped { .. } => None,
        })
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DeleteOutcome::Skipped { .. }))
            .count()
    }
}

/// How a restore selector resolved against the store.
#[derive(Debug, Clone)]
pub enum RestoreMatch {
    Single(TrashRecord),
    /// Pattern mode only; the caller picks one.
    Ambiguous(Vec<TrashRecord>),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RestoreOutcome {
    Restored { id: String, destination: PathBuf },
    Cancelled { id: String },
}

/// Totals from a purge or an applied retention sweep.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PurgeSummary {
    pub count: usize,
    pub bytes_freed: u64,
    /// Ids whose payload was already gone from the repository.
    pub missing_payloads: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SweepReport {
    pub cutoff: String,
    pub candidates: Vec<TrashRecord>,
    /// `None` for a dry run.
    pub summary: Option<PurgeSummary>,
}

#[derive(Debug, Clone, Copy)]
pub enum ExitStatusLike {
    Ok,
    Error,
}

impl ExitStatusLike {
    pub fn as_code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Error => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("size".parse::<SortKey>().unwrap(), SortKey::Size);
        assert_eq!("NAME".parse::<SortKey>().unwrap(), SortKey::Name);
        assert!("bogus".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_conflict_choice_parse() {
        assert_eq!("rename".parse::<ConflictChoice>().unwrap(), ConflictChoice::Rename);
        assert_eq!("o".parse::<ConflictChoice>().unwrap(), ConflictChoice::Overwrite);
        assert!("maybe".parse::<ConflictChoice>().is_err());
    }

    #[test]
    fn test_item_kind_round_trip() {
        for kind in [ItemKind::File, ItemKind::Directory] {
            assert_eq!(kind.as_str().parse::<ItemKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_original_path_joins_dir_and_name() {
        let record = TrashRecord {
            id: "1_abc".into(),
            original_name: "my notes.txt".into(),
            original_dir: "/home/u/docs".into(),
            deleted_at: "2025-10-05 10:00:00".into(),
            size_bytes: 3,
            kind: ItemKind::File,
            mode: 0o644,
            owner: "u:u".into(),
        };
        assert_eq!(record.original_path(), PathBuf::from("/home/u/docs/my notes.txt"));
    }
}
