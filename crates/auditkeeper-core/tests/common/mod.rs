//! Shared fixtures for the core end-to-end tests.
//!
//! [`LockingProbe`] wraps the real local-filesystem probe and lets a test
//! mark paths as locked (removal fails) or unreadable (copy fails). Tests may
//! run as root, where read-only permissions do not stop a delete, so the
//! failure has to be injected at the probe.
#![allow(dead_code)]

use auditkeeper_core::model::{Algorithm, RecordStatus, Statistics};
use auditkeeper_core::probe::{FileProbe, FileStat, ListedFile, LocalProbe, SharedProbe};
use auditkeeper_core::service::CompletedAnalysis;
use auditkeeper_core::storage::MemoryStore;
use auditkeeper_core::HistoryService;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Default)]
pub struct LockingProbe {
    inner: LocalProbe,
    locked: Mutex<HashSet<PathBuf>>,
    unreadable: Mutex<HashSet<PathBuf>>,
    /// Extra entries reported by `list_files` that are not on disk.
    phantoms: Mutex<Vec<ListedFile>>,
}

impl LockingProbe {
    pub fn lock(&self, path: &Path) {
        self.locked.lock().insert(path.to_path_buf());
    }

    pub fn unlock(&self, path: &Path) {
        self.locked.lock().remove(path);
    }

    pub fn make_unreadable(&self, path: &Path) {
        self.unreadable.lock().insert(path.to_path_buf());
    }

    /// List `path` even though it does not exist, as if it vanished between
    /// the listing and the removal.
    pub fn add_phantom(&self, path: &Path, size: u64) {
        self.phantoms.lock().push(ListedFile {
            path: path.to_path_buf(),
            size,
            modified: None,
        });
    }
}

impl FileProbe for LockingProbe {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        self.inner.exists(path)
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        self.inner.stat(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        if self.locked.lock().contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "the file is open in another program",
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
        let mut files = self.inner.list_files(dir)?;
        files.extend(self.phantoms.lock().iter().cloned());
        Ok(files)
    }
}

/// A service over an in-memory store whose temp-results directory lives in
/// `tmp`, plus the probe it uses.
pub struct Fixture {
    pub tmp: TempDir,
    pub probe: Arc<LockingProbe>,
    pub service: HistoryService,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let probe = Arc::new(LockingProbe::default());
        let shared: SharedProbe = probe.clone();
        let service = HistoryService::with_parts(
            Arc::new(MemoryStore::new()),
            shared,
            tmp.path().join("temp_results"),
        );
        fs::create_dir_all(service.temp_dir()).expect("failed to create temp_results");
        Self {
            tmp,
            probe,
            service,
        }
    }

    /// Write `n` bytes to `name` inside the temp-results directory.
    pub fn result_file(&self, name: &str, n: usize) -> PathBuf {
        let path = self.service.temp_dir().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, vec![0u8; n]).unwrap();
        path
    }

    /// Record a successful FIFO run that produced `output`.
    pub fn record(&self, output: &Path) -> String {
        self.record_with_pool(output, None)
    }

    pub fn record_with_pool(&self, output: &Path, pool: Option<&Path>) -> String {
        let (record, _) = self
            .service
            .record_completed_analysis(CompletedAnalysis {
                algorithm: Algorithm::Fifo,
                input_path: self.tmp.path().join("ledger.xlsx"),
                output_path: output.to_path_buf(),
                offsite_pool_path: pool.map(Path::to_path_buf),
                statistics: Statistics {
                    total_records: 120,
                    processing_time_ms: 850,
                    validation_errors: 0,
                    validation_fixes: 2,
                },
                status: RecordStatus::Success,
                summary: None,
            })
            .expect("record_completed_analysis failed");
        record.id
    }

    /// Move a record's timestamp `days` into the past.
    pub fn backdate(&self, id: &str, days: i64) {
        let records = self.service.records();
        let mut record = records.get_record(id).expect("record not found");
        record.timestamp -= chrono::Duration::days(days);
        assert!(records.update_record(record).unwrap());
    }
}
