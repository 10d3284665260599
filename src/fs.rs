use crate::errors::CoreError;
use std::ffi::{CStr, CString};
use std::fs::{self, Metadata, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{symlink, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Filesystem abstraction boundary for the store, repository and engine.
///
/// Keeping this trait narrow makes it easy to write deterministic tests
/// (e.g. a fixed clock) without touching the components that consume it.
pub trait FileSystem: Send + Sync {
    /// Returns the current time in wall-clock format.
    fn now(&self) -> SystemTime;

    /// Returns true when path exists (symlink-aware).
    fn exists(&self, path: &Path) -> bool;

    /// Reads symlink metadata.
    fn symlink_metadata(&self, path: &Path) -> crate::Result<Metadata>;

    /// Creates a directory and all missing parent directories.
    fn create_dir_all(&self, path: &Path) -> crate::Result<()>;

    /// Replaces the file content atomically (temp file in the same directory + rename).
    fn write_atomic(&self, path: &Path, content: &str) -> crate::Result<()>;

    /// Appends one line with a single write on an `O_APPEND` handle.
    fn append_line(&self, path: &Path, line: &str) -> crate::Result<()>;

    /// Reads UTF-8 text.
    fn read_to_string(&self, path: &Path) -> crate::Result<String>;

    /// Reads at most `limit` leading bytes.
    fn read_head(&self, path: &Path, limit: usize) -> crate::Result<Vec<u8>>;

    /// Moves a path, falling back to copy + remove across devices.
    fn move_path(&self, from: &Path, to: &Path) -> crate::Result<()>;

    /// Removes a file, symlink or whole directory tree.
    fn remove_all(&self, path: &Path) -> crate::Result<()>;

    /// Sets permission bits.
    fn set_mode(&self, path: &Path, mode: u32) -> crate::Result<()>;

    /// Lists directory children as concrete paths.
    fn list_dir(&self, path: &Path) -> crate::Result<Vec<PathBuf>>;

    /// Whether the effective user may read `path`.
    fn can_read(&self, path: &Path) -> bool;

    /// Whether the effective user may write `path`.
    fn can_write(&self, path: &Path) -> bool;
}

/// Default filesystem implementation backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn symlink_metadata(&self, path: &Path) -> crate::Result<Metadata> {
        fs::symlink_metadata(path).map_err(|err| CoreError::io(path, err))
    }

    fn create_dir_all(&self, path: &Path) -> crate::Result<()> {
        fs::create_dir_all(path).map_err(|err| CoreError::io(path, err))
    }

    fn write_atomic(&self, path: &Path, content: &str) -> crate::Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|err| CoreError::io(dir, err))?;
        tmp.write_all(content.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|err| CoreError::io(tmp.path(), err))?;
        tmp.persist(path).map_err(|err| CoreError::io(path, err.error))?;
        Ok(())
    }

    fn append_line(&self, path: &Path, line: &str) -> crate::Result<()> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(buf.as_bytes()))
            .map_err(|err| CoreError::io(path, err))
    }

    fn read_to_string(&self, path: &Path) -> crate::Result<String> {
        fs::read_to_string(path).map_err(|err| CoreError::io(path, err))
    }

    fn read_head(&self, path: &Path, limit: usize) -> crate::Result<Vec<u8>> {
        let file = fs::File::open(path).map_err(|err| CoreError::io(path, err))?;
        let mut buf = Vec::with_capacity(limit);
        file.take(limit as u64)
            .read_to_end(&mut buf)
            .map_err(|err| CoreError::io(path, err))?;
        Ok(buf)
    }

    fn move_path(&self, from: &Path, to: &Path) -> crate::Result<()> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err) if err.raw_os_error() == Some(libc::EXDEV) => {
                tracing::debug!(from = %from.display(), to = %to.display(), "cross-device move, copying");
                copy_then_remove(from, to)
            }
            Err(err) => Err(CoreError::io(from, err)),
        }
    }

    fn remove_all(&self, path: &Path) -> crate::Result<()> {
        remove_tree(path).map_err(|err| CoreError::io(path, err))
    }

    fn set_mode(&self, path: &Path, mode: u32) -> crate::Result<()> {
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|err| CoreError::io(path, err))
    }

    fn list_dir(&self, path: &Path) -> crate::Result<Vec<PathBuf>> {
        fs::read_dir(path)
            .map_err(|err| CoreError::io(path, err))?
            .map(|entry| entry.map(|v| v.path()))
            .collect::<Result<Vec<PathBuf>, io::Error>>()
            .map_err(|err| CoreError::io(path, err))
    }

    fn can_read(&self, path: &Path) -> bool {
        access(path, libc::R_OK)
    }

    fn can_write(&self, path: &Path) -> bool {
        access(path, libc::W_OK)
    }
}

fn access(path: &Path, mode: libc::c_int) -> bool {
    match CString::new(path.as_os_str().as_bytes()) {
        Ok(c_path) => unsafe { libc::access(c_path.as_ptr(), mode) == 0 },
        Err(_) => false,
    }
}

/// `user:group` for the owner of `meta`, numeric ids when names are unknown.
pub fn owner_label(meta: &Metadata) -> String {
    let user = user_name(meta.uid()).unwrap_or_else(|| meta.uid().to_string());
    let group = group_name(meta.gid()).unwrap_or_else(|| meta.gid().to_string());
    format!("{user}:{group}")
}

fn user_name(uid: u32) -> Option<String> {
    let mut buf = vec![0 as libc::c_char; 4096];
    let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::passwd = std::ptr::null_mut();
    let rc = unsafe { libc::getpwuid_r(uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result) };
    if rc != 0 || result.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(pwd.pw_name) }.to_string_lossy().into_owned())
}

fn group_name(gid: u32) -> Option<String> {
    let mut buf = vec![0 as libc::c_char; 4096];
    let mut grp: libc::group = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::group = std::ptr::null_mut();
    let rc = unsafe { libc::getgrgid_r(gid, &mut grp, buf.as_mut_ptr(), buf.len(), &mut result) };
    if rc != 0 || result.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(grp.gr_name) }.to_string_lossy().into_owned())
}

/// Copies `from` to `to`, then removes `from`. A failed copy leaves nothing at `to`.
fn copy_then_remove(from: &Path, to: &Path) -> crate::Result<()> {
    if let Err(err) = copy_tree(from, to) {
        if fs::symlink_metadata(to).is_ok() {
            if let Err(cleanup) = remove_tree(to) {
                tracing::error!(path = %to.display(), error = %cleanup, "could not remove partial copy");
            }
        }
        return Err(CoreError::io(to, err));
    }
    remove_tree(from).map_err(|err| CoreError::io(from, err))
}

fn remove_tree(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(from)?;
    let file_type = meta.file_type();
    if file_type.is_symlink() {
        symlink(fs::read_link(from)?, to)
    } else if file_type.is_dir() {
        fs::create_dir(to)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            copy_tree(&entry.path(), &to.join(entry.file_name()))?;
        }
        fs::set_permissions(to, meta.permissions())
    } else {
        fs::copy(from, to).map(|_| ())
    }
}
