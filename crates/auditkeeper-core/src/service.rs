/// One handle bundling the stores, the probe, and the
/// temp-results directory for a frontend.
///
/// The components themselves stay free functions over explicit
/// dependencies; the service only wires them together and maps hard
/// failures into [`JobResult::Failed`] for background jobs.
use crate::cleanup::{
    self, BulkDeleteReport, ExportCleanupOutcome, ExportError, ExportReport, TimeRangeSelection,
};
use crate::deletion::{self, DeleteOutcome};
use crate::error::StoreError;
use crate::history::{
    AddRecordOutcome, HistoryStatistics, QueryHistoryStore, RecordStore, SaveReport,
};
use crate::jobs::{Job, JobResult};
use crate::model::{
    Algorithm, AnalysisHistory, AnalysisRecord, FinancialSummary, InputFile, QueryHistory,
    QueryHistoryRecord, RecordStatus, Statistics, TrackedFile,
};
use crate::orphan::{
    self, HistorySyncReport, OrphanCleanupReport, TempDirectoryUsage, TempFileInfo,
};
use crate::paths::AppPaths;
use crate::probe::{FileProbe, LocalProbe, SharedProbe};
use crate::reconcile::{self, RecordStatusUpdate, SyncSummary};
use crate::storage::{schema, JsonFileStore, SettingsStore, SharedStore};
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// What the analysis engine hands back after a run.
#[derive(Debug, Clone)]
pub struct CompletedAnalysis {
    pub algorithm: Algorithm,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub offsite_pool_path: Option<PathBuf>,
    pub statistics: Statistics,
    pub status: RecordStatus,
    pub summary: Option<FinancialSummary>,
}

pub struct HistoryService {
    probe: SharedProbe,
    settings: SettingsStore,
    records: RecordStore,
    queries: QueryHistoryStore,
    temp_dir: PathBuf,
}

impl HistoryService {
    /// Production wiring: JSON files under `paths.store_dir`, the local
    /// filesystem, and a schema check before anything is read.
    pub fn open(paths: &AppPaths) -> Result<Self, StoreError> {
        paths.ensure_dirs()?;
        let kv: SharedStore = Arc::new(JsonFileStore::new(&paths.store_dir));
        let check = schema::ensure_current(kv.as_ref())?;
        info!(
            "History store at {} ({:?})",
            paths.store_dir.display(),
            check
        );
        Ok(Self::with_parts(
            kv,
            Arc::new(LocalProbe::new()),
            paths.temp_results_dir.clone(),
        ))
    }

    /// Explicit wiring, used by tests and alternative frontends.
    pub fn with_parts(kv: SharedStore, probe: SharedProbe, temp_dir: impl Into<PathBuf>) -> Self {
        let settings = SettingsStore::new(kv.clone());
        Self {
            records: RecordStore::new(kv.clone(), settings.clone(), probe.clone()),
            queries: QueryHistoryStore::new(kv),
            settings,
            probe,
            temp_dir: temp_dir.into(),
        }
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn queries(&self) -> &QueryHistoryStore {
        &self.queries
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn probe(&self) -> &dyn FileProbe {
        self.probe.as_ref()
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    // ── Recording ───────────────────────────────────────────────────────────

    /// Turn an engine result into a history record and store it.
    ///
    /// File sizes are read through the probe; a file that cannot be
    /// inspected is recorded without a size.
    pub fn record_completed_analysis(
        &self,
        analysis: CompletedAnalysis,
    ) -> Result<(AnalysisRecord, AddRecordOutcome), StoreError> {
        let probe_size = |path: &Path| match self.probe.stat(path) {
            Ok(stat) => Some(stat.size),
            Err(e) => {
                warn!("Could not stat {}: {}", path.display(), e);
                None
            }
        };

        let input = InputFile::new(
            &analysis.input_path,
            probe_size(&analysis.input_path).unwrap_or(0),
        );
        let output = TrackedFile::new(&analysis.output_path, probe_size(&analysis.output_path));
        let mut record = AnalysisRecord::new(
            analysis.algorithm,
            input,
            output,
            analysis.statistics,
            analysis.status,
        );
        if let Some(pool) = &analysis.offsite_pool_path {
            record = record.with_offsite_pool_file(TrackedFile::new(pool, probe_size(pool)));
        }
        if let Some(summary) = analysis.summary {
            record = record.with_summary(summary);
        }

        let outcome = self.records.add_record(record.clone())?;
        Ok((record, outcome))
    }

    pub fn add_query(&self, query: QueryHistoryRecord) -> Result<(), StoreError> {
        self.queries.add_query(query)
    }

    // ── Reading ─────────────────────────────────────────────────────────────

    pub fn history(&self) -> AnalysisHistory {
        self.records.load()
    }

    pub fn query_history(&self) -> QueryHistory {
        self.queries.load()
    }

    pub fn statistics(&self) -> HistoryStatistics {
        self.records.statistics()
    }

    pub fn history_with_real_time_status(&self) -> Result<AnalysisHistory, StoreError> {
        reconcile::history_with_real_time_status(&self.records, self.probe())
    }

    pub fn records_before(&self, cutoff: DateTime<Utc>) -> TimeRangeSelection {
        cleanup::before_cutoff(&self.records, &self.queries, cutoff)
    }

    pub fn records_in_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> TimeRangeSelection {
        cleanup::records_in_time_range(&self.records, &self.queries, start, end)
    }

    // ── Reconciliation ──────────────────────────────────────────────────────

    pub fn sync_all(&self) -> Result<SyncSummary, StoreError> {
        reconcile::sync_all_records_file_status(&self.records, self.probe())
    }

    pub fn refresh_record(&self, id: &str) -> Result<Option<RecordStatusUpdate>, StoreError> {
        reconcile::reconcile_record(&self.records, self.probe(), id)
    }

    // ── Deletion ────────────────────────────────────────────────────────────

    pub fn delete_record(&self, id: &str) -> Result<DeleteOutcome, StoreError> {
        deletion::delete_record(&self.records, self.probe(), id)
    }

    pub fn delete_records(&self, ids: &[String]) -> Result<BulkDeleteReport, StoreError> {
        cleanup::delete_records_by_ids(&self.records, self.probe(), ids)
    }

    pub fn delete_in_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BulkDeleteReport, StoreError> {
        cleanup::delete_records_in_time_range(
            &self.records,
            &self.queries,
            self.probe(),
            start,
            end,
        )
    }

    pub fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<BulkDeleteReport, StoreError> {
        self.delete_in_time_range(DateTime::<Utc>::UNIX_EPOCH, cutoff)
    }

    pub fn enforce_limit(&self) -> Result<SaveReport, StoreError> {
        self.records.enforce_limit()
    }

    // ── Export ──────────────────────────────────────────────────────────────

    pub fn export(
        &self,
        destination: &Path,
        cutoff: DateTime<Utc>,
    ) -> Result<ExportReport, ExportError> {
        cleanup::export_records(&self.records, self.probe(), destination, cutoff)
    }

    pub fn export_then_cleanup(
        &self,
        destination: &Path,
        cutoff: DateTime<Utc>,
    ) -> Result<ExportCleanupOutcome, ExportError> {
        cleanup::export_then_cleanup(
            &self.records,
            &self.queries,
            self.probe(),
            destination,
            cutoff,
        )
    }

    // ── Temp directory ──────────────────────────────────────────────────────

    pub fn scan_orphans(&self) -> io::Result<Vec<TempFileInfo>> {
        orphan::scan_temp_directory(&self.records, self.probe(), &self.temp_dir)
    }

    pub fn cleanup_orphans(&self) -> io::Result<OrphanCleanupReport> {
        orphan::cleanup_safe_files(&self.records, self.probe(), &self.temp_dir)
    }

    pub fn sync_history_with_files(&self) -> Result<HistorySyncReport, StoreError> {
        orphan::sync_history_with_files(&self.records, self.probe(), &self.temp_dir)
    }

    pub fn temp_usage(&self) -> io::Result<TempDirectoryUsage> {
        orphan::temp_directory_usage(&self.records, self.probe(), &self.temp_dir)
    }

    /// Execute `job` synchronously. Background threads call this.
    pub fn run(&self, job: Job) -> JobResult {
        let label = job.label();
        let failed = |message: String| JobResult::Failed { label, message };

        match job {
            Job::SyncAll => self
                .sync_all()
                .map_or_else(|e| failed(e.to_string()), JobResult::Synced),
            Job::DeleteRecord(id) => match self.delete_record(&id) {
                Ok(outcome) => JobResult::Deleted { id, outcome },
                Err(e) => failed(e.to_string()),
            },
            Job::DeleteRecords(ids) => self
                .delete_records(&ids)
                .map_or_else(|e| failed(e.to_string()), JobResult::BulkDeleted),
            Job::DeleteBefore { cutoff } => self
                .delete_before(cutoff)
                .map_or_else(|e| failed(e.to_string()), JobResult::BulkDeleted),
            Job::Export {
                destination,
                cutoff,
            } => self
                .export(&destination, cutoff)
                .map_or_else(|e| failed(e.to_string()), JobResult::Exported),
            Job::ExportThenCleanup {
                destination,
                cutoff,
            } => self
                .export_then_cleanup(&destination, cutoff)
                .map_or_else(|e| failed(e.to_string()), JobResult::ExportCleanup),
            Job::ScanOrphans => self
                .scan_orphans()
                .map_or_else(|e| failed(e.to_string()), JobResult::OrphansScanned),
            Job::CleanupOrphans => self
                .cleanup_orphans()
                .map_or_else(|e| failed(e.to_string()), JobResult::OrphansCleaned),
            Job::SyncHistoryWithFiles => self
                .sync_history_with_files()
                .map_or_else(|e| failed(e.to_string()), JobResult::HistorySynced),
            Job::EnforceLimit => self
                .enforce_limit()
                .map_or_else(|e| failed(e.to_string()), JobResult::LimitEnforced),
        }
    }
}
