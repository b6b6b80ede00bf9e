/// Drift reconciliation between history records and result files on disk.
///
/// A tracked file that vanished without going through the deletion engine is
/// marked deleted with a [`REMOVED_EXTERNALLY`](crate::model::record::REMOVED_EXTERNALLY)
/// note; a file marked deleted that reappears is restored. Running the
/// reconciler twice in a row changes nothing the second time.
use crate::error::StoreError;
use crate::history::{Mutation, RecordStore};
use crate::model::{AnalysisHistory, AnalysisRecord};
use crate::probe::FileProbe;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A probe failure attributed to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordError {
    pub record_id: String,
    pub message: String,
}

/// Result of reconciling a single record.
#[derive(Debug, Clone)]
pub struct RecordStatusUpdate {
    /// At least one flag changed.
    pub updated: bool,
    pub record: AnalysisRecord,
    /// References that could not be checked; their flags are untouched.
    pub errors: Vec<String>,
}

/// Result of [`sync_all_records_file_status`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub total_checked: usize,
    pub total_updated: usize,
    pub errors: Vec<RecordError>,
}

/// Compare one record's tracked files against the probe.
///
/// Pure: the caller decides whether to persist the returned record.
pub fn update_record_file_status(
    probe: &dyn FileProbe,
    record: &AnalysisRecord,
) -> RecordStatusUpdate {
    let mut record = record.clone();
    let mut updated = false;
    let mut errors = Vec::new();

    for (role, file) in record.tracked_files_mut() {
        let exists = match probe.exists(&file.path) {
            Ok(exists) => exists,
            Err(e) => {
                errors.push(format!(
                    "could not check {} {}: {}",
                    role.label(),
                    file.path.display(),
                    e
                ));
                continue;
            }
        };

        if !exists && !file.deleted {
            debug!("{} removed externally: {}", role.label(), file.path.display());
            file.mark_removed_externally();
            updated = true;
        } else if exists && file.deleted {
            debug!("{} reappeared: {}", role.label(), file.path.display());
            file.mark_present();
            updated = true;
        }
    }

    RecordStatusUpdate {
        updated,
        record,
        errors,
    }
}

/// Reconcile one stored record and persist it if anything changed.
///
/// Returns `None` for an unknown id.
pub fn reconcile_record(
    store: &RecordStore,
    probe: &dyn FileProbe,
    id: &str,
) -> Result<Option<RecordStatusUpdate>, StoreError> {
    store.update(|history| {
        let Some(current) = history.find(id) else {
            return Mutation::Discard(None);
        };
        let update = update_record_file_status(probe, current);
        if update.updated {
            history.replace(update.record.clone());
            Mutation::Save(Some(update))
        } else {
            Mutation::Discard(Some(update))
        }
    })
}

/// Reconcile every record, saving once at the end if anything changed.
///
/// Per-record probe failures are collected, never fatal.
pub fn sync_all_records_file_status(
    store: &RecordStore,
    probe: &dyn FileProbe,
) -> Result<SyncSummary, StoreError> {
    let start = Instant::now();

    let summary = store.update(|history| {
        let updates: Vec<RecordStatusUpdate> = history
            .records
            .par_iter()
            .map(|record| update_record_file_status(probe, record))
            .collect();

        let mut summary = SyncSummary {
            total_checked: updates.len(),
            ..Default::default()
        };
        for (slot, update) in history.records.iter_mut().zip(updates) {
            for message in update.errors {
                summary.errors.push(RecordError {
                    record_id: update.record.id.clone(),
                    message,
                });
            }
            if update.updated {
                summary.total_updated += 1;
                *slot = update.record;
            }
        }

        if summary.total_updated > 0 {
            Mutation::Save(summary)
        } else {
            Mutation::Discard(summary)
        }
    })?;

    for error in &summary.errors {
        warn!("Reconcile {}: {}", error.record_id, error.message);
    }
    info!(
        "Reconciled {} record(s), {} updated, {} error(s) in {:.1?}",
        summary.total_checked,
        summary.total_updated,
        summary.errors.len(),
        start.elapsed()
    );
    Ok(summary)
}

/// Reconcile, then return the up-to-date history.
pub fn history_with_real_time_status(
    store: &RecordStore,
    probe: &dyn FileProbe,
) -> Result<AnalysisHistory, StoreError> {
    sync_all_records_file_status(store, probe)?;
    Ok(store.load())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::REMOVED_EXTERNALLY;
    use crate::model::{Algorithm, InputFile, RecordStatus, Statistics, TrackedFile};
    use crate::probe::LocalProbe;
    use std::path::Path;
    use tempfile::TempDir;

    fn record_for(output: &Path) -> AnalysisRecord {
        AnalysisRecord::new(
            Algorithm::Fifo,
            InputFile::new("/in/ledger.xlsx", 1),
            TrackedFile::new(output, Some(1)),
            Statistics::default(),
            RecordStatus::Success,
        )
    }

    #[test]
    fn missing_file_is_marked_removed_externally() {
        let tmp = TempDir::new().unwrap();
        let record = record_for(&tmp.path().join("gone.xlsx"));

        let update = update_record_file_status(&LocalProbe::new(), &record);
        assert!(update.updated);
        assert!(update.record.output_file.deleted);
        assert!(update.record.output_file.delete_error.is_none());
        assert_eq!(update.record.output_file.note.as_deref(), Some(REMOVED_EXTERNALLY));
    }

    #[test]
    fn reappearing_file_is_restored() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("back.xlsx");
        let mut record = record_for(&path);
        record.output_file.mark_removed_externally();
        std::fs::write(&path, b"x").unwrap();

        let update = update_record_file_status(&LocalProbe::new(), &record);
        assert!(update.updated);
        assert!(update.record.output_file.is_live());
        assert!(update.record.output_file.note.is_none());
    }

    #[test]
    fn present_and_live_is_unchanged() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("here.xlsx");
        std::fs::write(&path, b"x").unwrap();

        let update = update_record_file_status(&LocalProbe::new(), &record_for(&path));
        assert!(!update.updated);
        assert!(update.errors.is_empty());
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let probe = LocalProbe::new();
        let record = record_for(&tmp.path().join("gone.xlsx"))
            .with_offsite_pool_file(TrackedFile::new(tmp.path().join("pool.xlsx"), None));

        let first = update_record_file_status(&probe, &record);
        let second = update_record_file_status(&probe, &first.record);
        assert!(first.updated);
        assert!(!second.updated);
        assert_eq!(first.record, second.record);
    }
}
