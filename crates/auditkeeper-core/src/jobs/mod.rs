/// Background jobs: long-running history operations off the UI thread.
///
/// A job runs on a named thread against a shared [`HistoryService`] and
/// reports through a bounded channel that the UI drains once per frame.
/// Jobs are not cancellable; each one ends with exactly one
/// [`JobProgress::Finished`] message.
pub mod progress;

pub use progress::JobProgress;

use crate::cleanup::{BulkDeleteReport, ExportCleanupOutcome, ExportReport};
use crate::deletion::DeleteOutcome;
use crate::history::SaveReport;
use crate::orphan::{HistorySyncReport, OrphanCleanupReport, TempFileInfo};
use crate::reconcile::SyncSummary;
use crate::service::HistoryService;
use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{error, info};

/// Capacity of the progress channel. A job sends two messages.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 16;

/// A unit of background work.
#[derive(Debug, Clone)]
pub enum Job {
    /// Reconcile every record against the filesystem.
    SyncAll,
    DeleteRecord(String),
    DeleteRecords(Vec<String>),
    /// Delete everything recorded at or before the cutoff.
    DeleteBefore { cutoff: DateTime<Utc> },
    Export {
        destination: PathBuf,
        cutoff: DateTime<Utc>,
    },
    ExportThenCleanup {
        destination: PathBuf,
        cutoff: DateTime<Utc>,
    },
    ScanOrphans,
    CleanupOrphans,
    SyncHistoryWithFiles,
    /// Apply the history bound now.
    EnforceLimit,
}

impl Job {
    pub fn label(&self) -> &'static str {
        match self {
            Self::SyncAll => "Checking result files",
            Self::DeleteRecord(_) => "Deleting record",
            Self::DeleteRecords(_) => "Deleting records",
            Self::DeleteBefore { .. } => "Deleting old records",
            Self::Export { .. } => "Exporting records",
            Self::ExportThenCleanup { .. } => "Exporting and deleting old records",
            Self::ScanOrphans => "Scanning temp files",
            Self::CleanupOrphans => "Removing orphan files",
            Self::SyncHistoryWithFiles => "Syncing history with files",
            Self::EnforceLimit => "Trimming history",
        }
    }
}

/// Structured outcome of a [`Job`].
#[derive(Debug, Clone)]
pub enum JobResult {
    Synced(SyncSummary),
    Deleted {
        id: String,
        outcome: DeleteOutcome,
    },
    BulkDeleted(BulkDeleteReport),
    Exported(ExportReport),
    ExportCleanup(ExportCleanupOutcome),
    OrphansScanned(Vec<TempFileInfo>),
    OrphansCleaned(OrphanCleanupReport),
    HistorySynced(HistorySyncReport),
    LimitEnforced(SaveReport),
    /// The job hit a hard failure; nothing past the failing step ran.
    Failed { label: &'static str, message: String },
}

impl JobResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Handle to a running or completed job.
pub struct JobHandle {
    pub label: &'static str,
    /// Receiver for progress updates from the job thread.
    pub progress_rx: Receiver<JobProgress>,
    _thread: thread::JoinHandle<()>,
}

/// Run `job` on a background thread.
pub fn start_job(service: Arc<HistoryService>, job: Job) -> io::Result<JobHandle> {
    let (progress_tx, progress_rx) =
        crossbeam_channel::bounded::<JobProgress>(PROGRESS_CHANNEL_CAPACITY);
    let label = job.label();

    let thread = thread::Builder::new()
        .name("auditkeeper-job".into())
        .spawn(move || {
            info!("Job started: {label}");
            let _ = progress_tx.send(JobProgress::Started { label });

            let start = Instant::now();
            let result = service.run(job);
            let duration = start.elapsed();

            if let JobResult::Failed { message, .. } = &result {
                error!("Job failed: {label}: {message}");
            } else {
                info!("Job finished: {label} in {duration:.1?}");
            }
            let _ = progress_tx.send(JobProgress::Finished { result, duration });
        })?;

    Ok(JobHandle {
        label,
        progress_rx,
        _thread: thread,
    })
}
