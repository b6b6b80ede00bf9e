/// Orphan scanner for the temp-results directory.
///
/// Every file below the directory is classified against the paths the
/// history references (deleted or not). A file is safe to delete when no
/// record references it, or when every referencing entry is already marked
/// deleted. Listing uses the probe's parallel recursive walk.
use crate::error::StoreError;
use crate::history::{Mutation, RecordStore};
use crate::model::AnalysisHistory;
use crate::probe::{path_key, remove_if_present, FileProbe, ListedFile, Removal};
use compact_str::CompactString;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// One file found in the temp-results directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempFileInfo {
    pub name: CompactString,
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub is_tracked: bool,
    pub can_safe_delete: bool,
    /// Ids of records referencing this file.
    pub referenced_by: Vec<String>,
}

/// Result of [`cleanup_safe_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrphanCleanupReport {
    /// Files now gone, including ones that vanished before removal.
    pub deleted: usize,
    pub already_missing: usize,
    pub freed_bytes: u64,
    pub errors: Vec<String>,
}

/// Result of [`sync_history_with_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistorySyncReport {
    pub records_removed: usize,
    pub orphans_removed: usize,
    pub errors: Vec<String>,
}

/// Size breakdown of the temp-results directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TempDirectoryUsage {
    pub total_files: usize,
    pub total_bytes: u64,
    pub tracked_files: usize,
    pub tracked_bytes: u64,
    pub untracked_files: usize,
    pub untracked_bytes: u64,
    pub safe_to_delete_files: usize,
    pub safe_to_delete_bytes: u64,
}

/// Path key -> `(record id, reference deleted)` for every tracked reference.
fn reference_index(history: &AnalysisHistory) -> HashMap<PathBuf, Vec<(String, bool)>> {
    let mut index: HashMap<PathBuf, Vec<(String, bool)>> = HashMap::new();
    for record in &history.records {
        for (_, file) in record.tracked_files() {
            index
                .entry(path_key(&file.path))
                .or_default()
                .push((record.id.clone(), file.deleted));
        }
    }
    index
}

fn classify(history: &AnalysisHistory, listed: Vec<ListedFile>) -> Vec<TempFileInfo> {
    let index = reference_index(history);
    listed
        .into_iter()
        .map(|file| {
            let refs = index.get(&path_key(&file.path));
            let is_tracked = refs.is_some();
            let can_safe_delete =
                refs.map_or(true, |refs| refs.iter().all(|(_, deleted)| *deleted));
            let mut referenced_by: Vec<String> = refs
                .map(|refs| refs.iter().map(|(id, _)| id.clone()).collect())
                .unwrap_or_default();
            referenced_by.dedup();

            TempFileInfo {
                name: file
                    .path
                    .file_name()
                    .map(|n| CompactString::from(n.to_string_lossy()))
                    .unwrap_or_default(),
                path: file.path,
                size: file.size,
                modified: file.modified,
                is_tracked,
                can_safe_delete,
                referenced_by,
            }
        })
        .collect()
}

/// Classify every file below `temp_dir`. A missing directory is empty.
pub fn scan_temp_directory(
    store: &RecordStore,
    probe: &dyn FileProbe,
    temp_dir: &Path,
) -> io::Result<Vec<TempFileInfo>> {
    let listed = probe.list_files(temp_dir)?;
    let files = classify(&store.load(), listed);
    debug!(
        "Scanned {}: {} file(s), {} untracked",
        temp_dir.display(),
        files.len(),
        files.iter().filter(|f| !f.is_tracked).count()
    );
    Ok(files)
}

/// Remove exactly the files [`scan_temp_directory`] reports as safe.
pub fn cleanup_safe_files(
    store: &RecordStore,
    probe: &dyn FileProbe,
    temp_dir: &Path,
) -> io::Result<OrphanCleanupReport> {
    let files = scan_temp_directory(store, probe, temp_dir)?;
    let mut report = OrphanCleanupReport::default();

    for file in files.iter().filter(|f| f.can_safe_delete) {
        match remove_if_present(probe, &file.path) {
            Ok(Removal::Removed) => {
                report.deleted += 1;
                report.freed_bytes += file.size;
            }
            Ok(Removal::AlreadyMissing) => {
                report.deleted += 1;
                report.already_missing += 1;
            }
            Err(e) => {
                warn!("Could not remove {}: {}", file.path.display(), e);
                report
                    .errors
                    .push(format!("{}: {}", file.path.display(), e));
            }
        }
    }

    info!(
        "Orphan cleanup removed {} file(s), freed {} byte(s), {} error(s)",
        report.deleted,
        report.freed_bytes,
        report.errors.len()
    );
    Ok(report)
}

/// Drop records whose files are all gone, then remove untracked files.
///
/// The record pass is saved before the rescan so the orphan pass sees the
/// pruned history.
pub fn sync_history_with_files(
    store: &RecordStore,
    probe: &dyn FileProbe,
    temp_dir: &Path,
) -> Result<HistorySyncReport, StoreError> {
    let mut report = HistorySyncReport::default();

    report.records_removed = store.update(|history| {
        let before = history.len();
        history.records.retain(|record| {
            record
                .tracked_files()
                .any(|(_, file)| probe.exists(&file.path).unwrap_or(true))
        });
        let removed = before - history.len();
        if removed > 0 {
            Mutation::Save(removed)
        } else {
            Mutation::Discard(removed)
        }
    })?;

    match scan_temp_directory(store, probe, temp_dir) {
        Ok(files) => {
            for file in files.iter().filter(|f| !f.is_tracked) {
                match remove_if_present(probe, &file.path) {
                    Ok(_) => report.orphans_removed += 1,
                    Err(e) => report
                        .errors
                        .push(format!("{}: {}", file.path.display(), e)),
                }
            }
        }
        Err(e) => report
            .errors
            .push(format!("could not list {}: {}", temp_dir.display(), e)),
    }

    info!(
        "History sync removed {} dead record(s) and {} orphan file(s)",
        report.records_removed, report.orphans_removed
    );
    Ok(report)
}

/// Totals for the settings screen.
pub fn temp_directory_usage(
    store: &RecordStore,
    probe: &dyn FileProbe,
    temp_dir: &Path,
) -> io::Result<TempDirectoryUsage> {
    let files = scan_temp_directory(store, probe, temp_dir)?;
    let mut usage = TempDirectoryUsage::default();
    for file in &files {
        usage.total_files += 1;
        usage.total_bytes += file.size;
        if file.is_tracked {
            usage.tracked_files += 1;
            usage.tracked_bytes += file.size;
        } else {
            usage.untracked_files += 1;
            usage.untracked_bytes += file.size;
        }
        if file.can_safe_delete {
            usage.safe_to_delete_files += 1;
            usage.safe_to_delete_bytes += file.size;
        }
    }
    Ok(usage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Algorithm, AnalysisRecord, InputFile, RecordStatus, Statistics, TrackedFile};

    fn listed(path: &str, size: u64) -> ListedFile {
        ListedFile {
            path: PathBuf::from(path),
            size,
            modified: None,
        }
    }

    fn record_for(path: &str) -> AnalysisRecord {
        AnalysisRecord::new(
            Algorithm::Fifo,
            InputFile::new("/in/ledger.xlsx", 1),
            TrackedFile::new(path, None),
            Statistics::default(),
            RecordStatus::Success,
        )
    }

    #[test]
    fn classification_follows_reference_flags() {
        let live = record_for("/tmp/results/live.xlsx");
        let mut gone = record_for("/tmp/results/gone.xlsx");
        gone.output_file.mark_deleted();

        let mut history = AnalysisHistory::empty(10);
        history.prepend(live.clone());
        history.prepend(gone.clone());

        let files = classify(
            &history,
            vec![
                listed("/tmp/results/live.xlsx", 10),
                listed("/tmp/results/./gone.xlsx", 20),
                listed("/tmp/results/stray.xlsx", 30),
            ],
        );

        let by_name = |name: &str| files.iter().find(|f| f.name == name).unwrap();
        let live_info = by_name("live.xlsx");
        assert!(live_info.is_tracked && !live_info.can_safe_delete);
        assert_eq!(live_info.referenced_by, vec![live.id.clone()]);

        let gone_info = by_name("gone.xlsx");
        assert!(gone_info.is_tracked && gone_info.can_safe_delete);

        let stray = by_name("stray.xlsx");
        assert!(!stray.is_tracked && stray.can_safe_delete);
        assert!(stray.referenced_by.is_empty());
    }

    #[test]
    fn a_live_reference_anywhere_blocks_deletion() {
        let live = record_for("/tmp/results/shared.xlsx");
        let mut dead = record_for("/tmp/results/shared.xlsx");
        dead.output_file.mark_deleted();

        let mut history = AnalysisHistory::empty(10);
        history.prepend(live);
        history.prepend(dead);

        let files = classify(&history, vec![listed("/tmp/results/shared.xlsx", 1)]);
        assert!(files[0].is_tracked);
        assert!(!files[0].can_safe_delete);
        assert_eq!(files[0].referenced_by.len(), 2);
    }
}
