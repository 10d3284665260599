//! Shared utility helpers: timestamps, names and small parsing rules.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::errors::{CoreError, Result};

/// Deletion date format stored in the metadata store and the audit log.
/// Lexicographic order equals chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Suffix format used when a restore is renamed around an occupied destination.
pub const CONFLICT_SUFFIX_FORMAT: &str = "%Y%m%d_%H%M%S";

const DATE_ONLY_FORMAT: &str = "%Y-%m-%d";

/// Returns a user-safe, trimmed path string that can be used in logs and messages.
pub fn sanitize_user_path(path: &Path) -> String {
    path.display().to_string().trim().to_string()
}

/// Serializes a wall-clock time into the repository-standard timestamp.
pub fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a stored deletion timestamp.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()
}

/// Timestamp `retention_days` before `now`; records at or before it are expired.
pub fn retention_cutoff(now: SystemTime, retention_days: u32) -> String {
    let now = DateTime::<Local>::from(now);
    (now - Duration::days(i64::from(retention_days)))
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Normalizes a search bound to the stored timestamp format.
///
/// A bare date is widened to the start (`upper == false`) or end of that day so
/// both ends of a range stay inclusive.
pub fn normalize_date_bound(value: &str, upper: bool) -> Result<String> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_ONLY_FORMAT) {
        let time = if upper {
            date.and_hms_opt(23, 59, 59)
        } else {
            date.and_hms_opt(0, 0, 0)
        };
        return time
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            .ok_or_else(|| CoreError::invalid_input(format!("invalid date: {value}")));
    }
    parse_timestamp(value)
        .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .ok_or_else(|| CoreError::invalid_input(format!("invalid date '{value}', expected YYYY-MM-DD")))
}

/// Human readable size rendering shared across commands.
pub fn print_size(bytes: u64) -> String {
    const SUFFIXES: [&str; 5] = ["B", "K", "M", "G", "T"];
    let mut value = bytes as f64;
    let mut idx = 0usize;

    while value >= 1024.0 && idx < SUFFIXES.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }

    if idx == 0 {
        format!("{:.0} {}", value, SUFFIXES[idx])
    } else {
        format!("{:.1} {}", value, SUFFIXES[idx])
    }
}

/// Returns a normalized path by resolving `.` and `..` segments where possible.
pub fn canonical_or_relaxed(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Inserts `_<stamp>` before the extension of `file_name`.
///
/// Dotfiles and names without an extension get the suffix appended.
pub fn build_conflict_name(file_name: &str, stamp: &str) -> String {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => {
            let (stem, ext) = file_name.split_at(idx);
            format!("{stem}_{stamp}{ext}")
        }
        _ => format!("{file_name}_{stamp}"),
    }
}

/// Only an unambiguous "yes" confirms a destructive action.
pub fn is_affirmative(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("yes")
}

/// Whether a value cannot be stored in a metadata row.
pub fn contains_reserved(value: &str) -> bool {
    value.contains(',') || value.contains('\n') || value.contains('\r')
}
