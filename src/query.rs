//! Read-only views over the store: list, search, statistics and preview.

use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;

use crate::audit::{AuditAction, AuditLog};
use crate::config::Config;
use crate::errors::{CoreError, Result};
use crate::fs::FileSystem;
use crate::helpers::normalize_date_bound;
use crate::models::{SortKey, TrashRecord};
use crate::repository::ItemRepository;
use crate::store::MetadataStore;

/// Bytes inspected to decide between text and binary.
pub const SNIFF_BYTES: usize = 8 * 1024;
/// Bytes read when collecting preview lines.
pub const PREVIEW_READ_BYTES: usize = 64 * 1024;
pub const PREVIEW_LINES: usize = 10;

const MAGIC: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "PNG image"),
    (b"\xff\xd8\xff", "JPEG image"),
    (b"GIF87a", "GIF image"),
    (b"GIF89a", "GIF image"),
    (b"%PDF-", "PDF document"),
    (b"PK\x03\x04", "Zip archive"),
    (b"\x1f\x8b", "gzip compressed data"),
    (b"\x7fELF", "ELF executable"),
];

#[derive(Debug, Clone)]
pub enum ListResult {
    Empty,
    Items(Listing),
}

#[derive(Debug, Clone)]
pub struct Listing {
    pub records: Vec<TrashRecord>,
    pub total_count: usize,
    pub total_bytes: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    /// Case-insensitive substring of the original name.
    pub name: Option<String>,
    /// Inclusive lower bound, `YYYY-MM-DD` or a full timestamp.
    pub date_from: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD` or a full timestamp.
    pub date_to: Option<String>,
}

impl SearchCriteria {
    fn name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    fn date_from(&self) -> Option<&str> {
        self.date_from.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    fn date_to(&self) -> Option<&str> {
        self.date_to.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.name().is_none() && self.date_from().is_none() && self.date_to().is_none()
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(name) = self.name() {
            parts.push(format!("name='{name}'"));
        }
        if let Some(from) = self.date_from() {
            parts.push(format!("from={from}"));
        }
        if let Some(to) = self.date_to() {
            parts.push(format!("to={to}"));
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone)]
pub enum SearchResult {
    NoCriteria,
    Matches(Vec<TrashRecord>),
    NoMatches(SearchMiss),
}

/// Which criterion emptied the result.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SearchMiss {
    /// The name filter matched nothing.
    Name,
    /// The date range matched nothing.
    DateRange,
    /// Neither filter matched anything on its own.
    Both,
    /// Each filter matched something, but never the same record.
    Combination,
}

#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub total_items: usize,
    pub total_bytes: u64,
    pub quota_bytes: u64,
    /// Truncated integer percentage of the advisory quota.
    pub quota_percent: u64,
    pub files: usize,
    pub directories: usize,
    pub newest: Option<TrashRecord>,
    pub oldest: Option<TrashRecord>,
    /// Over file records only; directory sizes are not recursive.
    pub average_file_size: Option<u64>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Preview {
    Directory { location: PathBuf },
    Text { lines: Vec<String>, truncated: bool },
    Binary { description: String, size: u64 },
}

/// Repository entries and records that lost their counterpart.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ConsistencyReport {
    /// Repository entries with no record.
    pub orphans: Vec<String>,
    /// Records with no repository entry.
    pub dangling: Vec<String>,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.orphans.is_empty() && self.dangling.is_empty()
    }
}

pub struct QueryEngine {
    config: Config,
    fs: Arc<dyn FileSystem>,
    store: MetadataStore,
    repo: ItemRepository,
    audit: AuditLog,
}

impl QueryEngine {
    pub fn new(config: Config, fs: Arc<dyn FileSystem>) -> Self {
        let store = MetadataStore::new(fs.clone(), &config.paths);
        let repo = ItemRepository::new(fs.clone(), &config.paths);
        let audit = AuditLog::new(fs.clone(), &config.paths);
        Self {
            config,
            fs,
            store,
            repo,
            audit,
        }
    }

    pub fn list(&self, sort: SortKey, reverse: bool) -> Result<ListResult> {
        let mut records = self.store.read_all()?;
        if records.is_empty() {
            return Ok(ListResult::Empty);
        }
        sort_records(&mut records, sort);
        if reverse {
            records.reverse();
        }
        let total_bytes = records.iter().map(|r| r.size_bytes).sum();
        Ok(ListResult::Items(Listing {
            total_count: records.len(),
            total_bytes,
            records,
        }))
    }

    /// All supplied criteria must hold.
    pub fn search(&self, criteria: &SearchCriteria) -> Result<SearchResult> {
        if criteria.is_empty() {
            return Ok(SearchResult::NoCriteria);
        }
        let from = criteria.date_from().map(|v| normalize_date_bound(v, false)).transpose()?;
        let to = criteria.date_to().map(|v| normalize_date_bound(v, true)).transpose()?;
        let needle = criteria.name().map(str::to_lowercase);

        let name_ok = |r: &TrashRecord| {
            needle
                .as_deref()
                .map_or(true, |n| r.original_name.to_lowercase().contains(n))
        };
        let date_ok = |r: &TrashRecord| {
            let ts = r.deleted_at.as_str();
            from.as_deref().map_or(true, |f| ts >= f) && to.as_deref().map_or(true, |t| ts <= t)
        };

        let records = self.store.read_all()?;
        let matches: Vec<TrashRecord> = records
            .iter()
            .filter(|r| name_ok(*r) && date_ok(*r))
            .cloned()
            .collect();

        self.audit.record_quietly(
            AuditAction::Search,
            &format!("{} -> {} result(s)", criteria.describe(), matches.len()),
        );

        if !matches.is_empty() {
            return Ok(SearchResult::Matches(matches));
        }

        let has_name = needle.is_some();
        let has_dates = from.is_some() || to.is_some();
        let name_hits = records.iter().filter(|r| name_ok(*r)).count();
        let date_hits = records.iter().filter(|r| date_ok(*r)).count();
        let miss = match (has_name && name_hits == 0, has_dates && date_hits == 0) {
            (true, true) => SearchMiss::Both,
            (true, false) => SearchMiss::Name,
            (false, true) => SearchMiss::DateRange,
            (false, false) => SearchMiss::Combination,
        };
        Ok(SearchResult::NoMatches(miss))
    }

    pub fn statistics(&self) -> Result<Statistics> {
        let records = self.store.read_all()?;
        let quota_bytes = self.config.quota_bytes();
        let mut stats = Statistics {
            quota_bytes,
            ..Statistics::default()
        };

        let mut file_bytes = 0u64;
        for record in &records {
            stats.total_items += 1;
            stats.total_bytes += record.size_bytes;
            if record.is_file() {
                stats.files += 1;
                file_bytes += record.size_bytes;
            } else {
                stats.directories += 1;
            }
        }

        if quota_bytes > 0 {
            stats.quota_percent = (u128::from(stats.total_bytes) * 100 / u128::from(quota_bytes)) as u64;
        }
        if stats.files > 0 {
            stats.average_file_size = Some(file_bytes / stats.files as u64);
        }
        stats.newest = records.iter().max_by(|a, b| a.deleted_at.cmp(&b.deleted_at)).cloned();
        stats.oldest = records.iter().min_by(|a, b| a.deleted_at.cmp(&b.deleted_at)).cloned();
        Ok(stats)
    }

    pub fn preview(&self, id: &str) -> Result<Preview> {
        let record = self
            .store
            .find(id)?
            .ok_or_else(|| CoreError::not_found(format!("no item with id {id}")))?;
        let location = self.repo.payload_path(&record.id);
        if !self.fs.exists(&location) {
            return Err(CoreError::MissingPayload {
                id: record.id,
                path: location,
            });
        }
        if !record.is_file() {
            return Ok(Preview::Directory { location });
        }

        let head = self.fs.read_head(&location, PREVIEW_READ_BYTES)?;
        let sniff = &head[..head.len().min(SNIFF_BYTES)];
        if let Some(description) = classify_binary(sniff, &record.original_name) {
            return Ok(Preview::Binary {
                description,
                size: record.size_bytes,
            });
        }

        let text = String::from_utf8_lossy(&head);
        let mut lines = text.lines();
        let shown: Vec<String> = lines.by_ref().take(PREVIEW_LINES).map(str::to_string).collect();
        let truncated = lines.next().is_some() || record.size_bytes > head.len() as u64;
        Ok(Preview::Text {
            lines: shown,
            truncated,
        })
    }

    /// Cross-checks the repository against the store without changing either.
    pub fn check_consistency(&self) -> Result<ConsistencyReport> {
        let records = self.store.read_all()?;
        let entries = self.repo.entries()?;
        let orphans = entries
            .iter()
            .filter(|name| !records.iter().any(|r| &r.id == *name))
            .cloned()
            .collect();
        let dangling = records
            .iter()
            .filter(|r| !entries.contains(&r.id))
            .map(|r| r.id.clone())
            .collect();
        Ok(ConsistencyReport { orphans, dangling })
    }
}

/// Orders records in place; `Date` and `Size` default to newest / largest first.
pub fn sort_records(records: &mut [TrashRecord], sort: SortKey) {
    match sort {
        SortKey::None => {}
        SortKey::Name => records.sort_by(|a, b| {
            a.original_name
                .to_lowercase()
                .cmp(&b.original_name.to_lowercase())
        }),
        SortKey::Date => records.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at)),
        SortKey::Size => records.sort_by(|a, b| match b.size_bytes.cmp(&a.size_bytes) {
            Ordering::Equal => a.original_name.cmp(&b.original_name),
            other => other,
        }),
    }
}

/// A description when `head` looks binary, `None` for text.
fn classify_binary(head: &[u8], name: &str) -> Option<String> {
    if let Some((_, label)) = MAGIC.iter().find(|(magic, _)| head.starts_with(magic)) {
        return Some((*label).to_string());
    }
    let invalid_utf8 = match std::str::from_utf8(head) {
        Ok(_) => false,
        // A multi-byte character cut off by the sniff window is still text.
        Err(err) => err.error_len().is_some(),
    };
    if head.contains(&0) || invalid_utf8 {
        let mime = mime_guess::from_path(name).first_or_octet_stream();
        return Some(format!("binary data ({})", mime.essence_str()));
    }
    None
}
