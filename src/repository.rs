use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::TrashPaths;
use crate::errors::{CoreError, Result};
use crate::fs::FileSystem;

/// Flat directory of trashed payloads, each named exactly by its trash id.
pub struct ItemRepository {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
}

impl ItemRepository {
    pub fn new(fs: Arc<dyn FileSystem>, paths: &TrashPaths) -> Self {
        Self {
            fs,
            dir: paths.files_dir.clone(),
        }
    }

    pub fn init(&self) -> Result<()> {
        self.fs.create_dir_all(&self.dir)
    }

    pub fn payload_path(&self, id: &str) -> PathBuf {
        self.dir.join(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.fs.exists(&self.payload_path(id))
    }

    /// Moves `source` into the repository under `id`.
    pub fn store(&self, id: &str, source: &Path) -> Result<PathBuf> {
        let target = self.payload_path(id);
        if self.fs.exists(&target) {
            return Err(CoreError::conflict(format!("repository entry {id} already exists")));
        }
        self.fs.move_path(source, &target)?;
        Ok(target)
    }

    /// Moves the payload for `id` out to `destination`.
    pub fn take(&self, id: &str, destination: &Path) -> Result<()> {
        let source = self.payload_path(id);
        if !self.fs.exists(&source) {
            return Err(CoreError::MissingPayload {
                id: id.to_string(),
                path: source,
            });
        }
        self.fs.move_path(&source, destination)
    }

    /// Permanently deletes the payload. Returns `false` when it was already gone.
    pub fn purge(&self, id: &str) -> Result<bool> {
        let path = self.payload_path(id);
        if !self.fs.exists(&path) {
            return Ok(false);
        }
        self.fs.remove_all(&path)?;
        Ok(true)
    }

    /// Names of every entry currently held.
    pub fn entries(&self) -> Result<Vec<String>> {
        if !self.fs.exists(&self.dir) {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = self
            .fs
            .list_dir(&self.dir)?
            .into_iter()
            .filter_map(|path| path.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }
}
