//! Fault-injecting probe for unit tests.

use super::{FileProbe, FileStat, ListedFile, LocalProbe};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

/// Local filesystem probe where selected paths refuse removal or copying,
/// the way a workbook held open in a spreadsheet application does.
#[derive(Default)]
pub(crate) struct FaultyProbe {
    inner: LocalProbe,
    locked: Mutex<HashSet<PathBuf>>,
    unreadable: Mutex<HashSet<PathBuf>>,
    unstatable: Mutex<HashSet<PathBuf>>,
}

impl FaultyProbe {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make removals of `path` fail.
    pub(crate) fn lock(&self, path: impl Into<PathBuf>) {
        self.locked.lock().insert(path.into());
    }

    pub(crate) fn unlock(&self, path: &Path) {
        self.locked.lock().remove(path);
    }

    /// Make copies from `path` fail.
    pub(crate) fn make_unreadable(&self, path: impl Into<PathBuf>) {
        self.unreadable.lock().insert(path.into());
    }

    /// Make existence checks of `path` fail.
    pub(crate) fn make_unstatable(&self, path: impl Into<PathBuf>) {
        self.unstatable.lock().insert(path.into());
    }
}

impl FileProbe for FaultyProbe {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        if self.unstatable.lock().contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "access is denied",
            ));
        }
        self.inner.exists(path)
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        self.inner.stat(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        if self.locked.lock().contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "file is in use by another process",
            ));
        }
        self.inner.remove(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        if self.unreadable.lock().contains(from) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "access is denied",
            ));
        }
        self.inner.copy(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.inner.create_dir_all(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.inner.write(path, contents)
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<ListedFile>> {
        self.inner.list_files(dir)
    }
}
