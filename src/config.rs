//! Recycle bin configuration and on-disk layout.
//!
//! The config file is plain `KEY=VALUE` lines. Only `MAX_SIZE_MB` and
//! `RETENTION_DAYS` are recognized.

use std::path::{Path, PathBuf};

use crate::errors::{CoreError, Result};
use crate::fs::FileSystem;

pub const KEY_MAX_SIZE_MB: &str = "MAX_SIZE_MB";
pub const KEY_RETENTION_DAYS: &str = "RETENTION_DAYS";

pub const DEFAULT_QUOTA_MB: u64 = 1024;
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Environment variable overriding the root directory.
pub const ROOT_ENV: &str = "RECYCLE_BIN_HOME";

/// Every location derived from the recycle bin root.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TrashPaths {
    pub root: PathBuf,
    pub files_dir: PathBuf,
    pub metadata_file: PathBuf,
    pub config_file: PathBuf,
    pub log_file: PathBuf,
    pub lock_file: PathBuf,
}

impl TrashPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            files_dir: root.join("files"),
            metadata_file: root.join("metadata.db"),
            config_file: root.join("config"),
            log_file: root.join("recycle_bin.log"),
            lock_file: root.join(".lock"),
            root,
        }
    }

    /// `$RECYCLE_BIN_HOME`, else `$HOME/.recycle_bin`.
    pub fn from_env() -> Result<Self> {
        if let Some(root) = std::env::var_os(ROOT_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(root));
        }
        let home = std::env::var_os("HOME")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CoreError::missing("HOME is not set"))?;
        Ok(Self::new(Path::new(&home).join(".recycle_bin")))
    }
}

/// Settings injected into every component at construction.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Config {
    pub paths: TrashPaths,
    /// Advisory only; reported by statistics, never enforced.
    pub quota_mb: u64,
    pub retention_days: u32,
}

impl Config {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            paths: TrashPaths::new(root),
            quota_mb: DEFAULT_QUOTA_MB,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }

    /// Reads the config file under `paths`; a missing file yields defaults.
    pub fn load(fs: &dyn FileSystem, paths: TrashPaths) -> Result<Self> {
        let mut config = Self {
            paths,
            quota_mb: DEFAULT_QUOTA_MB,
            retention_days: DEFAULT_RETENTION_DAYS,
        };
        if !fs.exists(&config.paths.config_file) {
            return Ok(config);
        }
        let content = fs.read_to_string(&config.paths.config_file)?;
        for (key, value) in parse_pairs(&content) {
            if let Err(err) = config.apply(key, value) {
                tracing::warn!(key, value, error = %err, "ignoring invalid config value");
            }
        }
        Ok(config)
    }

    /// Validates and applies one key; rejects anything but a positive integer.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)
    }

    /// Writes both recognized keys back to the config file.
    pub fn save(&self, fs: &dyn FileSystem) -> Result<()> {
        fs.write_atomic(&self.paths.config_file, &self.render())
    }

    pub fn render(&self) -> String {
        format!(
            "# Recycle bin configuration\n{KEY_MAX_SIZE_MB}={}\n{KEY_RETENTION_DAYS}={}\n",
            self.quota_mb, self.retention_days
        )
    }

    pub fn quota_bytes(&self) -> u64 {
        self.quota_mb.saturating_mul(1024 * 1024)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            KEY_MAX_SIZE_MB => self.quota_mb = parse_positive(key, value)?,
            KEY_RETENTION_DAYS => {
                let days = parse_positive(key, value)?;
                self.retention_days = u32::try_from(days)
                    .map_err(|_| CoreError::invalid_input(format!("{key} is too large: {value}")))?;
            }
            other => {
                return Err(CoreError::invalid_input(format!(
                    "unknown config key '{other}' (expected {KEY_MAX_SIZE_MB} or {KEY_RETENTION_DAYS})"
                )))
            }
        }
        Ok(())
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u64> {
    match value.trim().parse::<u64>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(CoreError::invalid_input(format!(
            "{key} must be a positive integer, got '{value}'"
        ))),
    }
}

fn parse_pairs(content: &str) -> impl Iterator<Item = (&str, &str)> {
    content.lines().filter_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        line.split_once('=').map(|(k, v)| (k.trim(), v.trim()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::RealFileSystem;

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&RealFileSystem, TrashPaths::new(dir.path())).unwrap();
        assert_eq!(config.quota_mb, 1024);
        assert_eq!(config.retention_days, 30);
    }

    #[test]
    fn test_load_reads_known_keys() {
        let dir = tempfile::tempdir().unwrap();
        let paths = TrashPaths::new(dir.path());
        std::fs::write(&paths.config_file, "# comment\nMAX_SIZE_MB = 2048\nRETENTION_DAYS=7\nOTHER=1\n").unwrap();
        let config = Config::load(&RealFileSystem, paths).unwrap();
        assert_eq!(config.quota_mb, 2048);
        assert_eq!(config.retention_days, 7);
    }

    #[test]
    fn test_invalid_file_values_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let paths = TrashPaths::new(dir.path());
        std::fs::write(&paths.config_file, "RETENTION_DAYS=0\nMAX_SIZE_MB=lots\n").unwrap();
        let config = Config::load(&RealFileSystem, paths).unwrap();
        assert_eq!(config.retention_days, 30);
        assert_eq!(config.quota_mb, 1024);
    }

    #[test]
    fn test_set_rejects_zero_retention() {
        let mut config = Config::new("/tmp/unused");
        let err = config.set(KEY_RETENTION_DAYS, "0").unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
        assert!(config.set(KEY_RETENTION_DAYS, "-3").is_err());
        assert!(config.set("COLOR", "1").is_err());
        config.set(KEY_RETENTION_DAYS, "14").unwrap();
        assert_eq!(config.retention_days, 14);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::new(dir.path());
        config.set(KEY_MAX_SIZE_MB, "10").unwrap();
        config.save(&RealFileSystem).unwrap();
        let loaded = Config::load(&RealFileSystem, TrashPaths::new(dir.path())).unwrap();
        assert_eq!(loaded.quota_mb, 10);
        assert_eq!(loaded.quota_bytes(), 10 * 1024 * 1024);
    }
}
