//! Metadata store: an ordered, comma-delimited record log.
//!
//! Layout is two fixed header lines followed by one record per line:
//!
//! ```text
//! # Recycle Bin Metadata
//! ID,ORIGINAL_NAME,ORIGINAL_PATH,DELETION_DATE,FILE_SIZE,FILE_TYPE,PERMISSIONS,OWNER
//! 1728123456_aB3dE5fG7hJ9,report.txt,/home/u/docs,2025-10-05 10:17:36,120,file,644,u:u
//! ```
//!
//! Fields cannot contain the delimiter or a line break; there is no escaping.
//! All parsing lives here so callers only ever see [`TrashRecord`].

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::TrashPaths;
use crate::errors::{CoreError, Result};
use crate::fs::FileSystem;
use crate::helpers::{contains_reserved, parse_timestamp};
use crate::lock::StoreLock;
use crate::models::{ItemKind, TrashRecord};

pub const HEADER_COMMENT: &str = "# Recycle Bin Metadata";
pub const HEADER_COLUMNS: &str = "ID,ORIGINAL_NAME,ORIGINAL_PATH,DELETION_DATE,FILE_SIZE,FILE_TYPE,PERMISSIONS,OWNER";

const DELIMITER: char = ',';
const FIELD_COUNT: usize = 8;
const HEADER_LINES: usize = 2;

pub struct MetadataStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    lock_path: PathBuf,
}

impl MetadataStore {
    pub fn new(fs: Arc<dyn FileSystem>, paths: &TrashPaths) -> Self {
        Self {
            fs,
            path: paths.metadata_file.clone(),
            lock_path: paths.lock_file.clone(),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Writes the header when the store does not exist yet.
    pub fn init(&self) -> Result<()> {
        let _lock = StoreLock::acquire(&self.lock_path)?;
        self.init_locked()
    }

    fn init_locked(&self) -> Result<()> {
        if !self.fs.exists(&self.path) {
            self.fs.write_atomic(&self.path, &header())?;
        }
        Ok(())
    }

    /// Appends one record with a single write.
    pub fn append(&self, record: &TrashRecord) -> Result<()> {
        let line = encode(record)?;
        let _lock = StoreLock::acquire(&self.lock_path)?;
        self.init_locked()?;
        self.fs.append_line(&self.path, &line)?;
        tracing::debug!(id = %record.id, "record appended");
        Ok(())
    }

    /// Every decodable record in insertion order.
    pub fn read_all(&self) -> Result<Vec<TrashRecord>> {
        if !self.fs.exists(&self.path) {
            return Ok(Vec::new());
        }
        let content = self.fs.read_to_string(&self.path)?;
        let mut records = Vec::new();
        for (lineno, line) in data_lines(&content) {
            match decode(line, lineno) {
                Ok(record) => records.push(record),
                Err(err) => tracing::warn!(error = %err, "skipping undecodable store row"),
            }
        }
        Ok(records)
    }

    pub fn find(&self, id: &str) -> Result<Option<TrashRecord>> {
        Ok(self.read_all()?.into_iter().find(|record| record.id == id))
    }

    /// Rewrites the store without the matching records and returns them.
    ///
    /// Undecodable rows are kept verbatim. Nothing is written when nothing
    /// matches.
    pub fn remove_where<P>(&self, mut predicate: P) -> Result<Vec<TrashRecord>>
    where
        P: FnMut(&TrashRecord) -> bool,
    {
        let _lock = StoreLock::acquire(&self.lock_path)?;
        if !self.fs.exists(&self.path) {
            return Ok(Vec::new());
        }
        let content = self.fs.read_to_string(&self.path)?;

        let mut kept = header();
        let mut removed = Vec::new();
        for (lineno, line) in data_lines(&content) {
            match decode(line, lineno) {
                Ok(record) if predicate(&record) => removed.push(record),
                _ => {
                    kept.push_str(line);
                    kept.push('\n');
                }
            }
        }

        if !removed.is_empty() {
            self.fs.write_atomic(&self.path, &kept)?;
            tracing::debug!(removed = removed.len(), "store rewritten");
        }
        Ok(removed)
    }
}

fn header() -> String {
    format!("{HEADER_COMMENT}\n{HEADER_COLUMNS}\n")
}

fn data_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .skip(HEADER_LINES)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| (idx + 1, line))
}

/// Serializes a record into one store row.
pub fn encode(record: &TrashRecord) -> Result<String> {
    let text_fields = [
        &record.id,
        &record.original_name,
        &record.original_dir,
        &record.deleted_at,
        &record.owner,
    ];
    if let Some(bad) = text_fields.iter().find(|v| contains_reserved(v)) {
        return Err(CoreError::invalid_path(format!(
            "'{bad}' contains a comma or line break and cannot be stored"
        )));
    }
    Ok(format!(
        "{},{},{},{},{},{},{:o},{}",
        record.id,
        record.original_name,
        record.original_dir,
        record.deleted_at,
        record.size_bytes,
        record.kind,
        record.mode,
        record.owner
    ))
}

/// Parses one store row; `line` is the 1-based line number for messages.
pub fn decode(row: &str, line: usize) -> Result<TrashRecord> {
    let corrupt = |reason: String| CoreError::CorruptRecord { line, reason };

    let fields: Vec<&str> = row.split(DELIMITER).collect();
    if fields.len() != FIELD_COUNT {
        return Err(corrupt(format!("expected {FIELD_COUNT} fields, found {}", fields.len())));
    }
    if fields[0].is_empty() {
        return Err(corrupt("empty id".to_string()));
    }
    if parse_timestamp(fields[3]).is_none() {
        return Err(corrupt(format!("bad deletion date '{}'", fields[3])));
    }
    let size_bytes = fields[4]
        .parse::<u64>()
        .map_err(|_| corrupt(format!("bad size '{}'", fields[4])))?;
    let kind: ItemKind = fields[5]
        .parse()
        .map_err(|_| corrupt(format!("bad type '{}'", fields[5])))?;
    let mode = u32::from_str_radix(fields[6], 8).map_err(|_| corrupt(format!("bad permissions '{}'", fields[6])))?;

    Ok(TrashRecord {
        id: fields[0].to_string(),
        original_name: fields[1].to_string(),
        original_dir: fields[2].to_string(),
        deleted_at: fields[3].to_string(),
        size_bytes,
        kind,
        mode,
        owner: fields[7].to_string(),
    })
}
