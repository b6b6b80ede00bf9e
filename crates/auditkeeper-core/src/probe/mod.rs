/// Filesystem capabilities used by the reconciler, deletion engine, export
/// pipeline, and orphan scanner.
///
/// Everything above this layer talks to a [`FileProbe`] trait object, never
/// to `std::fs` directly. Every answer is advisory: a file reported present
/// may be gone by the time it is acted on, so callers treat "not found" on
/// removal as success via [`remove_if_present`].
pub mod local;

#[cfg(test)]
pub(crate) mod test_support;

pub use local::LocalProbe;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Metadata for a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub is_file: bool,
}

/// A regular file found by [`FileProbe::list_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// The filesystem operations this crate needs.
pub trait FileProbe: Send + Sync {
    fn exists(&self, path: &Path) -> io::Result<bool>;

    fn stat(&self, path: &Path) -> io::Result<FileStat>;

    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Copy `from` to `to`, returning the number of bytes copied.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Every regular file below `dir`, recursively. A missing `dir` yields
    /// an empty list.
    fn list_files(&self, dir: &Path) -> io::Result<Vec<ListedFile>>;
}

/// Probe handle shared between components.
pub type SharedProbe = Arc<dyn FileProbe>;

/// How a removal request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    AlreadyMissing,
}

/// Remove `path`, treating a file that is already gone as success.
pub fn remove_if_present(probe: &dyn FileProbe, path: &Path) -> io::Result<Removal> {
    match probe.remove(path) {
        Ok(()) => Ok(Removal::Removed),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Removal::AlreadyMissing),
        Err(e) => Err(e),
    }
}

/// Comparable form of a path: `.` segments and trailing separators are
/// dropped, and on Windows the comparison is case-insensitive.
pub fn path_key(path: &Path) -> PathBuf {
    let normalised: PathBuf = path
        .components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect();
    if cfg!(windows) {
        PathBuf::from(normalised.to_string_lossy().to_lowercase())
    } else {
        normalised
    }
}
