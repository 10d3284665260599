#![allow(dead_code)]

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{Local, TimeZone};
use recycle_core::store::MetadataStore;
use recycle_core::{
    Config,
    CoreError,
    FileSystem,
    ItemKind,
    LifecycleEngine,
    QueryEngine,
    RealFileSystem,
    Result,
    TrashRecord,
};

/// Real filesystem with a frozen clock.
pub struct FixedClock {
    pub now: SystemTime,
}

impl FileSystem for FixedClock {
    fn now(&self) -> SystemTime {
        self.now
    }

    fn exists(&self, path: &Path) -> bool {
        RealFileSystem.exists(path)
    }

    fn symlink_metadata(&self, path: &Path) -> Result<Metadata> {
        RealFileSystem.symlink_metadata(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        RealFileSystem.create_dir_all(path)
    }

    fn write_atomic(&self, path: &Path, content: &str) -> Result<()> {
        RealFileSystem.write_atomic(path, content)
    }

    fn append_line(&self, path: &Path, line: &str) -> Result<()> {
        RealFileSystem.append_line(path, line)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        RealFileSystem.read_to_string(path)
    }

    fn read_head(&self, path: &Path, limit: usize) -> Result<Vec<u8>> {
        RealFileSystem.read_head(path, limit)
    }

    fn move_path(&self, from: &Path, to: &Path) -> Result<()> {
        RealFileSystem.move_path(from, to)
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        RealFileSystem.remove_all(path)
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        RealFileSystem.set_mode(path, mode)
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        RealFileSystem.list_dir(path)
    }

    fn can_read(&self, path: &Path) -> bool {
        RealFileSystem.can_read(path)
    }

    fn can_write(&self, path: &Path) -> bool {
        RealFileSystem.can_write(path)
    }
}

/// Real filesystem with switchable failures.
#[derive(Default)]
pub struct Faulty {
    pub fail_appends: bool,
    pub deny_writes: bool,
}

impl FileSystem for Faulty {
    fn now(&self) -> SystemTime {
        RealFileSystem.now()
    }

    fn exists(&self, path: &Path) -> bool {
        RealFileSystem.exists(path)
    }

    fn symlink_metadata(&self, path: &Path) -> Result<Metadata> {
        RealFileSystem.symlink_metadata(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        RealFileSystem.create_dir_all(path)
    }

    fn write_atomic(&self, path: &Path, content: &str) -> Result<()> {
        RealFileSystem.write_atomic(path, content)
    }

    fn append_line(&self, path: &Path, line: &str) -> Result<()> {
        if self.fail_appends {
            return Err(CoreError::io(path, std::io::Error::new(std::io::ErrorKind::Other, "disk full")));
        }
        RealFileSystem.append_line(path, line)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        RealFileSystem.read_to_string(path)
    }

    fn read_head(&self, path: &Path, limit: usize) -> Result<Vec<u8>> {
        RealFileSystem.read_head(path, limit)
    }

    fn move_path(&self, from: &Path, to: &Path) -> Result<()> {
        RealFileSystem.move_path(from, to)
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        RealFileSystem.remove_all(path)
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        RealFileSystem.set_mode(path, mode)
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        RealFileSystem.list_dir(path)
    }

    fn can_read(&self, path: &Path) -> bool {
        RealFileSystem.can_read(path)
    }

    fn can_write(&self, path: &Path) -> bool {
        !self.deny_writes && RealFileSystem.can_write(path)
    }
}

pub fn local_time(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> SystemTime {
    SystemTime::from(Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap())
}

pub struct Bench {
    pub dir: tempfile::TempDir,
    pub work: PathBuf,
    pub config: Config,
    pub fs: Arc<dyn FileSystem>,
}

impl Bench {
    pub fn new() -> Self {
        Self::with_fs(Arc::new(RealFileSystem))
    }

    pub fn at(now: SystemTime) -> Self {
        Self::with_fs(Arc::new(FixedClock { now }))
    }

    pub fn with_fs(fs: Arc<dyn FileSystem>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir_all(&work).unwrap();
        let config = Config::new(dir.path().join("recycle_bin"));
        let bench = Self { dir, work, config, fs };
        bench.engine().init().unwrap();
        bench
    }

    pub fn engine(&self) -> LifecycleEngine {
        LifecycleEngine::new(self.config.clone(), self.fs.clone())
    }

    pub fn queries(&self) -> QueryEngine {
        QueryEngine::new(self.config.clone(), self.fs.clone())
    }

    pub fn file(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.work.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Writes a payload and its record directly, bypassing delete.
    pub fn plant(&self, id: &str, name: &str, deleted_at: &str, size: u64, kind: ItemKind) {
        let payload = self.config.paths.files_dir.join(id);
        match kind {
            ItemKind::File => std::fs::write(&payload, vec![b'x'; size as usize]).unwrap(),
            ItemKind::Directory => std::fs::create_dir(&payload).unwrap(),
        }
        MetadataStore::new(self.fs.clone(), &self.config.paths)
            .append(&TrashRecord {
                id: id.to_string(),
                original_name: name.to_string(),
                original_dir: self.work.to_string_lossy().into_owned(),
                deleted_at: deleted_at.to_string(),
                size_bytes: size,
                kind,
                mode: 0o644,
                owner: "u:u".to_string(),
            })
            .unwrap();
    }

    pub fn record_ids(&self) -> Vec<String> {
        let store = MetadataStore::new(self.fs.clone(), &self.config.paths);
        let mut ids: Vec<String> = store.read_all().unwrap().into_iter().map(|r| r.id).collect();
        ids.sort();
        ids
    }

    /// Repository entry names, sorted.
    pub fn payloads(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.config.paths.files_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn audit_lines(&self) -> Vec<String> {
        std::fs::read_to_string(&self.config.paths.log_file)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}
