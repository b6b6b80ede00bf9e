/// Time-range cleanup: selecting old history, deleting it in bulk, and
/// exporting it first when the user wants a copy.
///
/// Bulk deletion reuses the single-record deletion engine inside one store
/// update, so a batch saves once and partially deleted records keep their
/// per-file flags. Export-then-cleanup never deletes anything unless every
/// selected file was copied.
pub mod export;

pub use export::{export_records, ExportError, ExportReport};

use crate::deletion::{apply_deletion, DeleteOutcome};
use crate::error::StoreError;
use crate::history::{Mutation, QueryHistoryStore, RecordStore};
use crate::model::{AnalysisHistory, AnalysisRecord, QueryHistoryRecord};
use crate::probe::FileProbe;
use crate::reconcile::sync_all_records_file_status;
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{info, warn};

/// Records and queries whose timestamp falls inside a range.
#[derive(Debug, Clone)]
pub struct TimeRangeSelection {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub analysis: Vec<AnalysisRecord>,
    pub queries: Vec<QueryHistoryRecord>,
}

impl TimeRangeSelection {
    pub fn is_empty(&self) -> bool {
        self.analysis.is_empty() && self.queries.is_empty()
    }

    /// Tracked files not yet marked deleted.
    pub fn tracked_file_count(&self) -> usize {
        self.analysis
            .iter()
            .flat_map(|r| r.tracked_files())
            .filter(|(_, file)| !file.deleted)
            .count()
    }

    pub fn tracked_bytes(&self) -> u64 {
        self.analysis.iter().map(|r| r.tracked_bytes()).sum()
    }
}

/// Result of a bulk deletion.
#[derive(Debug, Clone)]
pub struct BulkDeleteReport {
    /// Records whose files are all gone and which were removed.
    pub deleted: usize,
    /// Records kept with some files left behind.
    pub partially_deleted: usize,
    pub queries_deleted: usize,
    pub errors: Vec<String>,
    /// Store contents after the batch.
    pub remaining: AnalysisHistory,
}

/// What [`export_then_cleanup`] did.
#[derive(Debug, Clone)]
pub enum ExportCleanupOutcome {
    /// Some files could not be exported; nothing was deleted.
    ExportFailed { report: ExportReport },
    Completed {
        export: ExportReport,
        cleanup: BulkDeleteReport,
    },
}

/// Everything with `start <= timestamp <= end`.
pub fn records_in_time_range(
    records: &RecordStore,
    queries: &QueryHistoryStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> TimeRangeSelection {
    let in_range = |t: DateTime<Utc>| start <= t && t <= end;
    TimeRangeSelection {
        start,
        end,
        analysis: records
            .load()
            .records
            .into_iter()
            .filter(|r| in_range(r.timestamp))
            .collect(),
        queries: queries
            .load()
            .data
            .into_iter()
            .filter(|q| in_range(q.timestamp))
            .collect(),
    }
}

/// Everything recorded at or before `cutoff`.
pub fn before_cutoff(
    records: &RecordStore,
    queries: &QueryHistoryStore,
    cutoff: DateTime<Utc>,
) -> TimeRangeSelection {
    records_in_time_range(records, queries, DateTime::<Utc>::UNIX_EPOCH, cutoff)
}

/// Delete every record and query inside the range.
pub fn delete_records_in_time_range(
    records: &RecordStore,
    queries: &QueryHistoryStore,
    probe: &dyn FileProbe,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<BulkDeleteReport, StoreError> {
    let ids: Vec<String> = records
        .load()
        .records
        .into_iter()
        .filter(|r| start <= r.timestamp && r.timestamp <= end)
        .map(|r| r.id)
        .collect();

    let mut report = delete_batch(records, probe, &ids)?;
    report.queries_deleted =
        queries.retain(|q| !(start <= q.timestamp && q.timestamp <= end))?;

    info!(
        "Time-range cleanup {} .. {}: {} deleted, {} partial, {} queries removed",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d"),
        report.deleted,
        report.partially_deleted,
        report.queries_deleted
    );
    Ok(report)
}

/// Delete the given records. Unknown ids are reported as errors.
pub fn delete_records_by_ids(
    records: &RecordStore,
    probe: &dyn FileProbe,
    ids: &[String],
) -> Result<BulkDeleteReport, StoreError> {
    let report = delete_batch(records, probe, ids)?;
    info!(
        "Deleted {} of {} record(s), {} partial, {} error(s)",
        report.deleted,
        ids.len(),
        report.partially_deleted,
        report.errors.len()
    );
    Ok(report)
}

/// Export everything at or before `cutoff`, then delete it if the export
/// is complete.
///
/// Files are reconciled first so anything already gone from disk is not
/// reported as an export failure.
pub fn export_then_cleanup(
    records: &RecordStore,
    queries: &QueryHistoryStore,
    probe: &dyn FileProbe,
    destination: &Path,
    cutoff: DateTime<Utc>,
) -> Result<ExportCleanupOutcome, ExportError> {
    sync_all_records_file_status(records, probe)?;

    let export = export_records(records, probe, destination, cutoff)?;
    if !export.is_complete() {
        warn!(
            "Export to {} incomplete ({} failure(s)); skipping deletion",
            export.backup_dir.display(),
            export.errors.len()
        );
        return Ok(ExportCleanupOutcome::ExportFailed { report: export });
    }

    let cleanup = delete_records_in_time_range(
        records,
        queries,
        probe,
        DateTime::<Utc>::UNIX_EPOCH,
        cutoff,
    )?;
    Ok(ExportCleanupOutcome::Completed { export, cleanup })
}

fn delete_batch(
    records: &RecordStore,
    probe: &dyn FileProbe,
    ids: &[String],
) -> Result<BulkDeleteReport, StoreError> {
    let mut report = records.update(|history| {
        let mut report = BulkDeleteReport {
            deleted: 0,
            partially_deleted: 0,
            queries_deleted: 0,
            errors: Vec::new(),
            remaining: AnalysisHistory::empty(history.max_records),
        };
        let mut changed = false;

        for id in ids {
            match apply_deletion(history, probe, id) {
                DeleteOutcome::NotFound => report.errors.push(format!("record {id} not found")),
                DeleteOutcome::Removed => {
                    report.deleted += 1;
                    changed = true;
                }
                DeleteOutcome::Partial { errors, .. } => {
                    report.partially_deleted += 1;
                    report.errors.extend(errors);
                    changed = true;
                }
                DeleteOutcome::Failed { errors } => report.errors.extend(errors),
            }
        }

        if changed {
            Mutation::Save(report)
        } else {
            Mutation::Discard(report)
        }
    })?;
    report.remaining = records.load();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Algorithm, InputFile, QueryOutcome, RecordStatus, Statistics, TrackedFile};
    use crate::probe::LocalProbe;
    use crate::storage::{MemoryStore, SettingsStore};
    use chrono::Duration;
    use std::sync::Arc;

    struct Fixture {
        records: RecordStore,
        queries: QueryHistoryStore,
    }

    fn fixture() -> Fixture {
        let kv = Arc::new(MemoryStore::new());
        Fixture {
            records: RecordStore::new(
                kv.clone(),
                SettingsStore::new(kv.clone()),
                Arc::new(LocalProbe::new()),
            ),
            queries: QueryHistoryStore::new(kv),
        }
    }

    fn record_at(timestamp: DateTime<Utc>) -> AnalysisRecord {
        AnalysisRecord::new(
            Algorithm::Fifo,
            InputFile::new("/in/ledger.xlsx", 1),
            TrackedFile::new("/nonexistent/out.xlsx", None),
            Statistics::default(),
            RecordStatus::Success,
        )
        .with_timestamp(timestamp)
    }

    #[test]
    fn range_is_inclusive_and_partitions_the_history() {
        let f = fixture();
        let now = Utc::now();
        let old = record_at(now - Duration::days(40));
        let edge = record_at(now - Duration::days(30));
        let fresh = record_at(now - Duration::days(1));
        for r in [&old, &edge, &fresh] {
            f.records.add_record(r.clone()).unwrap();
        }
        let cutoff = edge.timestamp;

        let before = before_cutoff(&f.records, &f.queries, cutoff);
        let after = records_in_time_range(
            &f.records,
            &f.queries,
            cutoff + Duration::nanoseconds(1),
            now,
        );

        let ids: Vec<_> = before.analysis.iter().map(|r| r.id.clone()).collect();
        assert!(ids.contains(&old.id) && ids.contains(&edge.id));
        assert_eq!(after.analysis.len(), 1);
        assert_eq!(after.analysis[0].id, fresh.id);
        assert_eq!(before.analysis.len() + after.analysis.len(), 3);
    }

    #[test]
    fn time_range_delete_also_drops_queries() {
        let f = fixture();
        let now = Utc::now();
        f.records
            .add_record(record_at(now - Duration::days(10)))
            .unwrap();
        let kept = record_at(now);
        f.records.add_record(kept.clone()).unwrap();
        f.queries
            .add_query(
                QueryHistoryRecord::new(
                    "a.xlsx",
                    3,
                    Algorithm::Fifo,
                    QueryOutcome::Success {
                        summary: "ok".into(),
                    },
                )
                .with_timestamp(now - Duration::days(10)),
            )
            .unwrap();

        let report = delete_records_in_time_range(
            &f.records,
            &f.queries,
            &LocalProbe::new(),
            DateTime::<Utc>::UNIX_EPOCH,
            now - Duration::days(5),
        )
        .unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(report.queries_deleted, 1);
        assert_eq!(report.remaining.len(), 1);
        assert_eq!(report.remaining.records[0].id, kept.id);
        assert!(f.queries.load().data.is_empty());
    }

    #[test]
    fn unknown_ids_are_reported() {
        let f = fixture();
        let report =
            delete_records_by_ids(&f.records, &LocalProbe::new(), &["missing".to_owned()])
                .unwrap();
        assert_eq!(report.deleted, 0);
        assert_eq!(report.errors, vec!["record missing not found".to_owned()]);
    }
}
