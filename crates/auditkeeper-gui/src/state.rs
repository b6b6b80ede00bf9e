/// Application state management.
///
/// Centralises all mutable state that the UI reads and writes. Long
/// operations run as core background jobs; their messages are drained in
/// `process_job_messages()` once per frame, and the history snapshot is
/// reloaded after every job so the table always shows persisted state.
use auditkeeper_core::cleanup::{ExportCleanupOutcome, TimeRangeSelection};
use auditkeeper_core::deletion::DeleteOutcome;
use auditkeeper_core::history::HistoryStatistics;
use auditkeeper_core::jobs::{self, Job, JobHandle, JobProgress, JobResult};
use auditkeeper_core::model::size::format_size;
use auditkeeper_core::model::{AnalysisHistory, AnalysisRecord};
use auditkeeper_core::orphan::TempFileInfo;
use auditkeeper_core::HistoryService;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use crossbeam_channel::TryRecvError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default age, in days, preselected in the cleanup dialog.
pub const DEFAULT_CLEANUP_DAYS: u32 = 30;

/// Longest cutoff the cleanup dialog accepts.
pub const MAX_CLEANUP_DAYS: u32 = 3650;

/// Whether a background job is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppPhase {
    Idle,
    Working,
}

/// Severity of the status-bar message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Last outcome shown in the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    fn new(level: StatusLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// Cleanup dialog inputs and the preview derived from them.
#[derive(Debug, Clone)]
pub struct CleanupDialog {
    pub open: bool,
    /// Records at least this many days old are selected.
    pub cutoff_days: u32,
    pub destination: Option<PathBuf>,
    pub preview: Option<TimeRangeSelection>,
}

impl Default for CleanupDialog {
    fn default() -> Self {
        Self {
            open: false,
            cutoff_days: DEFAULT_CLEANUP_DAYS,
            destination: None,
            preview: None,
        }
    }
}

/// All application state.
pub struct AppState {
    pub service: Arc<HistoryService>,

    // ── History ────────────────────────────────────────
    pub history: AnalysisHistory,
    pub statistics: HistoryStatistics,
    /// Bound read from settings at the last refresh.
    pub max_records: usize,
    pub selected_record: Option<String>,

    // ── Jobs ───────────────────────────────────────────
    pub phase: AppPhase,
    pub job: Option<JobHandle>,
    pub last_job_duration: Option<Duration>,
    pub status: Option<StatusMessage>,

    // ── Dialogs and panels ─────────────────────────────
    pub cleanup: CleanupDialog,
    /// Record awaiting delete confirmation.
    pub pending_delete: Option<String>,
    pub show_orphan_panel: bool,
    pub orphans: Vec<TempFileInfo>,
    pub show_about: bool,

    // ── Preferences ────────────────────────────────────
    pub dark_mode: bool,
    pub confirm_before_delete: bool,
}

impl AppState {
    /// Create state over an opened service and load the current history.
    pub fn new(service: Arc<HistoryService>) -> Self {
        let settings = service.settings().load();
        let mut state = Self {
            history: AnalysisHistory::empty(settings.effective_max_history_records()),
            statistics: HistoryStatistics::default(),
            max_records: settings.effective_max_history_records(),
            selected_record: None,
            phase: AppPhase::Idle,
            job: None,
            last_job_duration: None,
            status: None,
            cleanup: CleanupDialog {
                destination: settings.last_export_dir.clone(),
                ..CleanupDialog::default()
            },
            pending_delete: None,
            show_orphan_panel: false,
            orphans: Vec::new(),
            show_about: false,
            dark_mode: settings.dark_mode,
            confirm_before_delete: settings.confirm_before_delete,
            service,
        };
        state.refresh_history();
        state
    }

    pub fn is_busy(&self) -> bool {
        self.phase == AppPhase::Working
    }

    /// Reload the history snapshot from the store.
    pub fn refresh_history(&mut self) {
        self.history = self.service.history();
        self.statistics = self.service.statistics();
        self.max_records = self.service.settings().max_history_records();

        if let Some(id) = &self.selected_record {
            if self.history.find(id).is_none() {
                self.selected_record = None;
            }
        }
        if self.cleanup.open {
            self.update_cleanup_preview();
        }
    }

    pub fn selected_record(&self) -> Option<&AnalysisRecord> {
        self.selected_record
            .as_deref()
            .and_then(|id| self.history.find(id))
    }

    /// True when the history holds more records than the configured bound.
    pub fn over_limit(&self) -> bool {
        self.history.len() > self.max_records
    }

    // ── Jobs ───────────────────────────────────────────────────────────

    /// Start `job` in the background. Returns `false` if another job is
    /// still running or the thread could not be spawned.
    pub fn start_job(&mut self, job: Job) -> bool {
        if self.is_busy() {
            tracing::debug!("Ignoring '{}' while a job is running", job.label());
            return false;
        }
        match jobs::start_job(self.service.clone(), job) {
            Ok(handle) => {
                self.job = Some(handle);
                self.phase = AppPhase::Working;
                true
            }
            Err(e) => {
                tracing::error!("Failed to spawn job thread: {e}");
                self.status = Some(StatusMessage::new(
                    StatusLevel::Error,
                    format!("Could not start background work: {e}"),
                ));
                false
            }
        }
    }

    /// Drain pending job messages. Called once per frame.
    ///
    /// Returns `true` if the UI should repaint.
    pub fn process_job_messages(&mut self) -> bool {
        let Some(handle) = &self.job else {
            return false;
        };

        let mut finished = None;
        let mut disconnected = false;
        loop {
            match handle.progress_rx.try_recv() {
                Ok(JobProgress::Started { label }) => {
                    tracing::debug!("Job picked up: {label}");
                }
                Ok(JobProgress::Finished { result, duration }) => {
                    finished = Some((result, duration));
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        if let Some((result, duration)) = finished {
            self.finish_job(result, Some(duration));
            true
        } else if disconnected {
            let label = handle.label;
            self.finish_job(
                JobResult::Failed {
                    label,
                    message: "the job ended without reporting a result".into(),
                },
                None,
            );
            true
        } else {
            false
        }
    }

    fn finish_job(&mut self, result: JobResult, duration: Option<Duration>) {
        self.job = None;
        self.phase = AppPhase::Idle;
        self.last_job_duration = duration;

        let follow_up = self.apply_result(result);
        self.refresh_history();
        if let Some(job) = follow_up {
            self.start_job(job);
        }
    }

    /// Turn a job result into a status message. Returns a job to run next,
    /// used to rescan the temp folder after it changed.
    fn apply_result(&mut self, result: JobResult) -> Option<Job> {
        use StatusLevel::*;

        let rescan = self.show_orphan_panel.then_some(Job::ScanOrphans);
        let (status, next) = match result {
            JobResult::Synced(summary) => {
                let text = format!(
                    "Checked {} record(s), {} updated",
                    summary.total_checked, summary.total_updated
                );
                if summary.errors.is_empty() {
                    (StatusMessage::new(Success, text), None)
                } else {
                    let text = format!("{text}; {} could not be checked", summary.errors.len());
                    (StatusMessage::new(Warning, text), None)
                }
            }
            JobResult::Deleted { id, outcome } => {
                let status = match &outcome {
                    DeleteOutcome::NotFound => {
                        StatusMessage::new(Warning, format!("Record {id} no longer exists"))
                    }
                    DeleteOutcome::Removed => {
                        StatusMessage::new(Success, "Record and its files deleted")
                    }
                    DeleteOutcome::Partial { errors, .. } => StatusMessage::new(
                        Warning,
                        format!(
                            "Record kept: {} file(s) could not be deleted. Close them and retry",
                            errors.len()
                        ),
                    ),
                    DeleteOutcome::Failed { errors } => StatusMessage::new(
                        Error,
                        format!(
                            "Nothing deleted: {}",
                            errors.first().map(String::as_str).unwrap_or("unknown error")
                        ),
                    ),
                };
                (status, rescan)
            }
            JobResult::BulkDeleted(report) => {
                let level = if report.errors.is_empty() { Success } else { Warning };
                let text = format!(
                    "{} record(s) deleted, {} kept with errors, {} queries removed",
                    report.deleted, report.partially_deleted, report.queries_deleted
                );
                (StatusMessage::new(level, text), rescan)
            }
            JobResult::Exported(report) => {
                let level = if report.is_complete() { Success } else { Warning };
                let mut text = format!(
                    "Exported {} file(s) ({}) to {}",
                    report.exported_files,
                    format_size(report.exported_bytes),
                    report.backup_dir.display()
                );
                if !report.is_complete() {
                    text.push_str(&format!("; {} file(s) failed", report.errors.len()));
                }
                (StatusMessage::new(level, text), None)
            }
            JobResult::ExportCleanup(ExportCleanupOutcome::ExportFailed { report }) => (
                StatusMessage::new(
                    Error,
                    format!(
                        "Export incomplete ({} file(s) failed); nothing was deleted",
                        report.errors.len()
                    ),
                ),
                None,
            ),
            JobResult::ExportCleanup(ExportCleanupOutcome::Completed { export, cleanup }) => {
                let level = if cleanup.errors.is_empty() { Success } else { Warning };
                let text = format!(
                    "Backed up {} record(s) to {}; {} deleted, {} kept with errors",
                    export.record_count,
                    export.backup_dir.display(),
                    cleanup.deleted,
                    cleanup.partially_deleted
                );
                (StatusMessage::new(level, text), rescan)
            }
            JobResult::OrphansScanned(files) => {
                let safe = files.iter().filter(|f| f.can_safe_delete).count();
                let text = format!(
                    "{} file(s) in the temp folder, {} safe to delete",
                    files.len(),
                    safe
                );
                self.orphans = files;
                (StatusMessage::new(Info, text), None)
            }
            JobResult::OrphansCleaned(report) => {
                let level = if report.errors.is_empty() { Success } else { Warning };
                let text = format!(
                    "Removed {} temp file(s), freed {}",
                    report.deleted + report.already_missing,
                    format_size(report.freed_bytes)
                );
                (StatusMessage::new(level, text), rescan)
            }
            JobResult::HistorySynced(report) => {
                let level = if report.errors.is_empty() { Success } else { Warning };
                let text = format!(
                    "{} dead record(s) and {} orphan file(s) removed",
                    report.records_removed, report.orphans_removed
                );
                (StatusMessage::new(level, text), rescan)
            }
            JobResult::LimitEnforced(report) => {
                let level = if report.eviction_errors.is_empty() {
                    Success
                } else {
                    Warning
                };
                let text = format!(
                    "History trimmed to {} record(s), {} evicted",
                    report.record_count,
                    report.evicted.len()
                );
                (StatusMessage::new(level, text), rescan)
            }
            JobResult::Failed { label, message } => (
                StatusMessage::new(Error, format!("{label} failed: {message}")),
                None,
            ),
        };
        self.status = Some(status);
        next
    }

    // ── Deletion ───────────────────────────────────────────────────────

    /// Ask to delete a record, going through confirmation if enabled.
    pub fn request_delete(&mut self, id: String) {
        if self.confirm_before_delete {
            self.pending_delete = Some(id);
        } else {
            self.start_job(Job::DeleteRecord(id));
        }
    }

    pub fn confirm_delete(&mut self) {
        if let Some(id) = self.pending_delete.take() {
            self.start_job(Job::DeleteRecord(id));
        }
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Re-check the selected record's files on the UI thread.
    pub fn refresh_selected(&mut self) {
        let Some(id) = self.selected_record.clone() else {
            return;
        };
        match self.service.refresh_record(&id) {
            Ok(Some(update)) => {
                let text = if update.updated {
                    "File status updated"
                } else {
                    "File status unchanged"
                };
                self.status = Some(StatusMessage::new(StatusLevel::Info, text));
                self.refresh_history();
            }
            Ok(None) => self.refresh_history(),
            Err(e) => {
                self.status = Some(StatusMessage::new(
                    StatusLevel::Error,
                    format!("Could not save file status: {e}"),
                ));
            }
        }
    }

    // ── Cleanup dialog ─────────────────────────────────────────────────

    pub fn open_cleanup_dialog(&mut self) {
        self.cleanup.open = true;
        self.update_cleanup_preview();
    }

    pub fn cleanup_cutoff(&self) -> DateTime<Utc> {
        let days = self.cleanup.cutoff_days.clamp(1, MAX_CLEANUP_DAYS);
        Utc::now() - ChronoDuration::days(i64::from(days))
    }

    /// Recompute which records the current cutoff selects.
    pub fn update_cleanup_preview(&mut self) {
        self.cleanup.preview = Some(self.service.records_before(self.cleanup_cutoff()));
    }

    /// Remember the export folder for this and later sessions.
    pub fn set_export_destination(&mut self, path: PathBuf) {
        let mut settings = self.service.settings().load();
        settings.last_export_dir = Some(path.clone());
        if let Err(e) = self.service.settings().save(&settings) {
            tracing::warn!("Could not remember export folder: {e}");
        }
        self.cleanup.destination = Some(path);
    }

    /// Export the selection, then delete it if every file was copied.
    pub fn start_export_then_cleanup(&mut self) -> bool {
        let Some(destination) = self.require_destination() else {
            return false;
        };
        let cutoff = self.cleanup_cutoff();
        self.start_job(Job::ExportThenCleanup {
            destination,
            cutoff,
        })
    }

    pub fn start_export_only(&mut self) -> bool {
        let Some(destination) = self.require_destination() else {
            return false;
        };
        let cutoff = self.cleanup_cutoff();
        self.start_job(Job::Export {
            destination,
            cutoff,
        })
    }

    pub fn start_delete_before(&mut self) -> bool {
        let cutoff = self.cleanup_cutoff();
        self.start_job(Job::DeleteBefore { cutoff })
    }

    fn require_destination(&mut self) -> Option<PathBuf> {
        if self.cleanup.destination.is_none() {
            self.status = Some(StatusMessage::new(
                StatusLevel::Error,
                "Choose an export folder first",
            ));
        }
        self.cleanup.destination.clone()
    }

    // ── Orphan panel ───────────────────────────────────────────────────

    /// Show or hide the temp-folder panel, scanning when it opens.
    pub fn toggle_orphan_panel(&mut self) {
        self.show_orphan_panel = !self.show_orphan_panel;
        if self.show_orphan_panel {
            self.start_job(Job::ScanOrphans);
        }
    }

    // ── Preferences ────────────────────────────────────────────────────

    pub fn toggle_dark_mode(&mut self) {
        self.dark_mode = !self.dark_mode;
        let mut settings = self.service.settings().load();
        settings.dark_mode = self.dark_mode;
        if let Err(e) = self.service.settings().save(&settings) {
            tracing::warn!("Could not save theme preference: {e}");
        }
    }

    pub fn set_confirm_before_delete(&mut self, confirm: bool) {
        self.confirm_before_delete = confirm;
        let mut settings = self.service.settings().load();
        settings.confirm_before_delete = confirm;
        if let Err(e) = self.service.settings().save(&settings) {
            tracing::warn!("Could not save delete confirmation preference: {e}");
        }
    }

    /// Open a result file with the system's default application.
    pub fn open_path(&mut self, path: &Path) {
        if let Err(e) = open::that(path) {
            tracing::warn!("Could not open {}: {e}", path.display());
            self.status = Some(StatusMessage::new(
                StatusLevel::Warning,
                format!("Could not open {}: {e}", path.display()),
            ));
        }
    }
}
