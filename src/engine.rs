//! Lifecycle engine: the only writer of the store and the repository.
//!
//! A path is `Active` until [`LifecycleEngine::delete`] moves it into the
//! repository and records it (`Trashed`). From there it either goes back via
//! [`LifecycleEngine::restore`] or is destroyed by a purge or a retention
//! sweep. A record exists iff its payload exists, except for the short
//! window between the two steps of a transition.

use std::collections::HashSet;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::audit::{AuditAction, AuditLog};
use crate::config::Config;
use crate::errors::{CoreError, Result};
use crate::fs::{owner_label, FileSystem};
use crate::helpers::{
    build_conflict_name,
    canonical_or_relaxed,
    contains_reserved,
    format_timestamp,
    retention_cutoff,
    sanitize_user_path,
    CONFLICT_SUFFIX_FORMAT,
};
use crate::id;
use crate::models::{
    ConflictChoice,
    DeleteOutcome,
    DeleteReport,
    ItemKind,
    PurgeScope,
    PurgeSummary,
    RestoreMatch,
    RestoreOutcome,
    SkipReason,
    SweepReport,
    TrashRecord,
};
use crate::repository::ItemRepository;
use crate::store::MetadataStore;
use crate::sweeper::{BackgroundSweep, SweepHandle};

pub struct LifecycleEngine {
    config: Config,
    fs: Arc<dyn FileSystem>,
    store: MetadataStore,
    repo: ItemRepository,
    audit: AuditLog,
}

impl LifecycleEngine {
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

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates the root, repository, store header, config and log. Idempotent.
    pub fn init(&self) -> Result<()> {
        self.fs.create_dir_all(&self.config.paths.root)?;
        self.repo.init()?;
        self.store.init()?;
        if !self.fs.exists(&self.config.paths.config_file) {
            self.config.save(self.fs.as_ref())?;
        }
        if !self.fs.exists(&self.config.paths.log_file) {
            self.fs.write_atomic(&self.config.paths.log_file, "")?;
        }
        Ok(())
    }

    /// Moves every path into the trash independently; one failure never
    /// aborts the rest.
    pub fn delete<P: AsRef<Path>>(&self, paths: &[P]) -> DeleteReport {
        let mut report = DeleteReport::default();
        for path in paths {
            let path = path.as_ref();
            let outcome = match self.delete_one(path) {
                Ok(record) => DeleteOutcome::Trashed(record),
                Err(reason) => {
                    tracing::warn!(path = %path.display(), reason = %reason, "skipped");
                    self.audit.record_quietly(
                        AuditAction::Delete,
                        &format!("skipped {}: {}", sanitize_user_path(path), reason),
                    );
                    DeleteOutcome::Skipped {
                        path: path.to_path_buf(),
                        reason,
                    }
                }
            };
            report.outcomes.push(outcome);
        }
        report
    }

    /// [`delete`](Self::delete) followed by a retention sweep on a worker thread.
    pub fn delete_and_sweep<P: AsRef<Path>>(&self, paths: &[P]) -> (DeleteReport, SweepHandle) {
        let report = self.delete(paths);
        let handle = BackgroundSweep::spawn(self.config.clone(), self.fs.clone());
        (report, handle)
    }

    fn delete_one(&self, path: &Path) -> std::result::Result<TrashRecord, SkipReason> {
        let meta = match self.fs.symlink_metadata(path) {
            Ok(meta) => meta,
            Err(_) => return Err(SkipReason::MissingPath(path.to_path_buf())),
        };

        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => {
                return Err(SkipReason::Failed(CoreError::invalid_path(format!(
                    "cannot trash {}",
                    path.display()
                ))))
            }
        };
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let parent = canonical_or_relaxed(&parent);
        let absolute = parent.join(&name);

        let root = canonical_or_relaxed(&self.config.paths.root);
        if absolute.starts_with(&root) {
            return Err(SkipReason::InsideTrash(path.to_path_buf()));
        }
        if root.starts_with(&absolute) {
            return Err(SkipReason::ContainsTrash(path.to_path_buf()));
        }

        let readable = meta.file_type().is_symlink() || self.fs.can_read(path);
        if !readable || !self.fs.can_write(&parent) {
            return Err(SkipReason::PermissionDenied(path.to_path_buf()));
        }

        let original_dir = match parent.to_str() {
            Some(dir) if !contains_reserved(&name) && !contains_reserved(dir) => dir.to_string(),
            _ => return Err(SkipReason::UnsupportedName(path.to_path_buf())),
        };

        let now = self.fs.now();
        let record = TrashRecord {
            id: id::generate(now),
            original_name: name,
            original_dir,
            deleted_at: format_timestamp(now),
            size_bytes: meta.len(),
            kind: if meta.is_dir() { ItemKind::Directory } else { ItemKind::File },
            mode: meta.mode() & 0o7777,
            owner: owner_label(&meta),
        };

        self.repo.store(&record.id, path).map_err(SkipReason::Failed)?;
        if let Err(err) = self.store.append(&record) {
            // Put the payload back so no payload exists without a record.
            if let Err(undo) = self.repo.take(&record.id, &absolute) {
                tracing::error!(id = %record.id, error = %undo, "could not roll back payload move");
            }
            return Err(SkipReason::Failed(err));
        }

        tracing::info!(id = %record.id, path = %absolute.display(), "trashed");
        self.audit.record_quietly(
            AuditAction::Delete,
            &format!(
                "{} -> {} ({} bytes, {})",
                absolute.display(),
                record.id,
                record.size_bytes,
                record.kind
            ),
        );
        Ok(record)
    }

    /// Resolves a restore selector: an exact id, or a case-insensitive
    /// substring of the original name.
    pub fn find_restore_candidates(&self, selector: &str) -> Result<RestoreMatch> {
        let selector = selector.trim();
        if selector.is_empty() {
            return Err(CoreError::missing("restore needs an id or a name pattern"));
        }

        // A selector shaped like an id that matches none is tried as a name.
        if id::looks_like_id(selector) {
            if let Some(record) = self.store.find(selector)? {
                return Ok(RestoreMatch::Single(record));
            }
        }

        let needle = selector.to_lowercase();
        let mut matches: Vec<TrashRecord> = self
            .store
            .read_all()?
            .into_iter()
            .filter(|r| r.original_name.to_lowercase().contains(&needle))
            .collect();
        match matches.len() {
            0 => Err(CoreError::not_found(format!("no item matches '{selector}'"))),
            1 => Ok(RestoreMatch::Single(matches.remove(0))),
            _ => Ok(RestoreMatch::Ambiguous(matches)),
        }
    }

    /// Moves the payload for `id` back to where it came from.
    ///
    /// When the destination is occupied the caller must supply a choice;
    /// without one this returns [`CoreError::Conflict`] and changes nothing.
    pub fn restore(&self, id: &str, on_conflict: Option<ConflictChoice>) -> Result<RestoreOutcome> {
        let outcome = self.restore_record(id, on_conflict);
        match &outcome {
            Ok(RestoreOutcome::Restored { .. }) => {}
            Ok(RestoreOutcome::Cancelled { id }) => {
                self.audit
                    .record_quietly(AuditAction::Restore, &format!("cancelled {id}: destination occupied"));
            }
            Err(err) => {
                tracing::warn!(id, error = %err, "restore failed");
                self.audit
                    .record_quietly(AuditAction::Restore, &format!("failed to restore {id}: {err}"));
            }
        }
        outcome
    }

    fn restore_record(&self, id: &str, on_conflict: Option<ConflictChoice>) -> Result<RestoreOutcome> {
        let record = self
            .store
            .find(id)?
            .ok_or_else(|| CoreError::not_found(format!("no item with id {id}")))?;
        if !self.repo.contains(&record.id) {
            return Err(CoreError::MissingPayload {
                id: record.id.clone(),
                path: self.repo.payload_path(&record.id),
            });
        }

        let dir = PathBuf::from(&record.original_dir);
        if !self.fs.exists(&dir) {
            tracing::info!(dir = %dir.display(), "recreating original directory");
            self.fs.create_dir_all(&dir)?;
        }

        if !self.fs.can_write(&dir) {
            return Err(CoreError::PermissionDenied(dir));
        }

        let mut destination = record.original_path();
        if self.fs.exists(&destination) {
            match on_conflict {
                None => {
                    return Err(CoreError::conflict(format!(
                        "{} already exists",
                        destination.display()
                    )))
                }
                Some(ConflictChoice::Cancel) => {
                    tracing::info!(id = %record.id, "restore cancelled on conflict");
                    return Ok(RestoreOutcome::Cancelled { id: record.id });
                }
                Some(ConflictChoice::Overwrite) => {
                    self.fs.remove_all(&destination)?;
                }
                Some(ConflictChoice::Rename) => {
                    let stamp = DateTime::<Local>::from(self.fs.now())
                        .format(CONFLICT_SUFFIX_FORMAT)
                        .to_string();
                    destination = dir.join(build_conflict_name(&record.original_name, &stamp));
                    if self.fs.exists(&destination) {
                        return Err(CoreError::conflict(format!(
                            "{} already exists",
                            destination.display()
                        )));
                    }
                }
            }
        }

        self.repo.take(&record.id, &destination)?;

        let restored_meta = self.fs.symlink_metadata(&destination)?;
        if !restored_meta.file_type().is_symlink() {
            if let Err(err) = self.fs.set_mode(&destination, record.mode) {
                tracing::warn!(path = %destination.display(), error = %err, "could not restore permissions");
            }
        }

        let target = record.id.clone();
        self.store.remove_where(|r| r.id == target)?;

        tracing::info!(id = %record.id, destination = %destination.display(), "restored");
        self.audit.record_quietly(
            AuditAction::Restore,
            &format!("{} -> {}", record.id, destination.display()),
        );
        Ok(RestoreOutcome::Restored {
            id: record.id,
            destination,
        })
    }

    /// Records a purge would destroy. Nothing is changed.
    pub fn purge_candidates(&self, scope: &PurgeScope) -> Result<Vec<TrashRecord>> {
        let records = self.store.read_all()?;
        let candidates = match scope {
            PurgeScope::All => records,
            PurgeScope::Id(id) => records.into_iter().filter(|r| &r.id == id).collect(),
            PurgeScope::Pattern(pattern) => {
                if pattern.trim().is_empty() {
                    return Err(CoreError::missing("purge pattern is empty"));
                }
                let needle = pattern.to_lowercase();
                records
                    .into_iter()
                    .filter(|r| matches_any_field(r, &needle))
                    .collect()
            }
        };
        Ok(candidates)
    }

    /// Permanently destroys already confirmed candidates.
    pub fn purge(&self, candidates: &[TrashRecord]) -> Result<PurgeSummary> {
        self.destroy(candidates, AuditAction::Empty)
    }

    /// Records at or before `now - retention_days`, plus that cutoff.
    pub fn retention_candidates(&self) -> Result<(String, Vec<TrashRecord>)> {
        if self.config.retention_days == 0 {
            return Err(CoreError::invalid_input("retention days must be a positive integer"));
        }
        let cutoff = retention_cutoff(self.fs.now(), self.config.retention_days);
        let candidates = self
            .store
            .read_all()?
            .into_iter()
            .filter(|r| r.deleted_at.as_str() <= cutoff.as_str())
            .collect();
        Ok((cutoff, candidates))
    }

    /// Purges expired records without confirmation; the configuration
    /// already authorizes it.
    pub fn sweep(&self, dry_run: bool) -> Result<SweepReport> {
        let (cutoff, candidates) = self.retention_candidates()?;
        if dry_run || candidates.is_empty() {
            tracing::debug!(cutoff = %cutoff, candidates = candidates.len(), dry_run, "retention sweep");
            return Ok(SweepReport {
                cutoff,
                candidates,
                summary: if dry_run { None } else { Some(PurgeSummary::default()) },
            });
        }
        let summary = self.destroy(&candidates, AuditAction::AutoClean)?;
        Ok(SweepReport {
            cutoff,
            candidates,
            summary: Some(summary),
        })
    }

    fn destroy(&self, candidates: &[TrashRecord], action: AuditAction) -> Result<PurgeSummary> {
        let mut summary = PurgeSummary::default();
        if candidates.is_empty() {
            return Ok(summary);
        }

        let mut doomed = HashSet::new();
        for record in candidates {
            match self.repo.purge(&record.id) {
                Ok(true) => {
                    doomed.insert(record.id.clone());
                }
                Ok(false) => {
                    tracing::warn!(id = %record.id, "payload already missing, dropping record");
                    summary.missing_payloads.push(record.id.clone());
                    doomed.insert(record.id.clone());
                }
                Err(err) => {
                    // Keep the record: its payload is still on disk.
                    tracing::error!(id = %record.id, error = %err, "could not delete payload");
                    self.audit
                        .record_quietly(action, &format!("failed to delete {}: {}", record.id, err));
                }
            }
        }

        let removed = self.store.remove_where(|r| doomed.contains(&r.id))?;
        for record in &removed {
            summary.count += 1;
            summary.bytes_freed += record.size_bytes;
            self.audit.record_quietly(
                action,
                &format!("permanently deleted {} ({})", record.id, record.original_path().display()),
            );
        }
        self.audit.record_quietly(
            action,
            &format!("removed {} item(s), freed {} bytes", summary.count, summary.bytes_freed),
        );
        tracing::info!(count = summary.count, bytes = summary.bytes_freed, action = %action, "purge finished");
        Ok(summary)
    }
}

fn matches_any_field(record: &TrashRecord, needle: &str) -> bool {
    let size = record.size_bytes.to_string();
    let mode = format!("{:o}", record.mode);
    [
        record.id.as_str(),
        record.original_name.as_str(),
        record.original_dir.as_str(),
        record.deleted_at.as_str(),
        size.as_str(),
        record.kind.as_str(),
        mode.as_str(),
        record.owner.as_str(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}
