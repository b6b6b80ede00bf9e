/// Removes a record's result files, then removes or
/// downgrades the record depending on how that went.
///
/// Each tracked reference is handled independently. A file that is already
/// gone counts as deleted. A reference that cannot be removed keeps
/// `deleted = false` and gains a `delete_error`, and the record is kept so
/// the user can see exactly what is left on disk.
use crate::error::StoreError;
use crate::history::{Mutation, RecordStore};
use crate::model::{AnalysisHistory, AnalysisRecord};
use crate::probe::{remove_if_present, FileProbe, Removal};
use tracing::{debug, info, warn};

/// Per-file outcome of [`delete_record_files`].
#[derive(Debug, Clone)]
pub struct FileDeletionReport {
    /// The record with its file flags updated.
    pub record: AnalysisRecord,
    /// References now confirmed absent, counting an unset offsite-pool slot.
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl FileDeletionReport {
    pub fn all_deleted(&self) -> bool {
        self.failed == 0
    }

    pub fn partially_deleted(&self) -> bool {
        self.succeeded > 0 && self.failed > 0
    }
}

/// What [`delete_record`] did.
#[derive(Debug, Clone)]
pub enum DeleteOutcome {
    /// No record with that id; nothing happened.
    NotFound,
    /// Every file is gone and the record was removed.
    Removed,
    /// At least one reference was removed or had nothing to remove, and at
    /// least one removal failed. The record stays with per-file flags
    /// persisted.
    Partial {
        errors: Vec<String>,
        record: AnalysisRecord,
    },
    /// Nothing could be removed; the record is unchanged.
    Failed { errors: Vec<String> },
}

impl DeleteOutcome {
    pub fn success(&self) -> bool {
        matches!(self, Self::Removed)
    }

    pub fn all_deleted(&self) -> bool {
        matches!(self, Self::Removed)
    }

    pub fn partially_deleted(&self) -> bool {
        matches!(self, Self::Partial { .. })
    }

    pub fn errors(&self) -> &[String] {
        match self {
            Self::Partial { errors, .. } | Self::Failed { errors } => errors,
            Self::NotFound | Self::Removed => &[],
        }
    }
}

/// Remove every tracked file of `record`. Does not touch the store.
pub fn delete_record_files(probe: &dyn FileProbe, record: &AnalysisRecord) -> FileDeletionReport {
    let mut record = record.clone();
    let mut succeeded = 0;
    let mut failed = 0;
    let mut errors = Vec::new();

    if record.offsite_pool_file.is_none() {
        succeeded += 1;
    }

    for (role, file) in record.tracked_files_mut() {
        match remove_if_present(probe, &file.path) {
            Ok(removal) => {
                if removal == Removal::AlreadyMissing {
                    debug!("{} already gone: {}", role.label(), file.path.display());
                }
                file.mark_deleted();
                succeeded += 1;
            }
            Err(e) => {
                let reason = format!(
                    "could not delete {} {}: {}",
                    role.label(),
                    file.path.display(),
                    e
                );
                warn!("{reason}");
                file.mark_delete_failed(e.to_string());
                errors.push(reason);
                failed += 1;
            }
        }
    }

    FileDeletionReport {
        record,
        succeeded,
        failed,
        errors,
    }
}

/// Delete the files of record `id` and apply the outcome to `history`.
///
/// Used inside a store update so that batches save once.
pub(crate) fn apply_deletion(
    history: &mut AnalysisHistory,
    probe: &dyn FileProbe,
    id: &str,
) -> DeleteOutcome {
    let Some(current) = history.find(id) else {
        return DeleteOutcome::NotFound;
    };
    let report = delete_record_files(probe, current);

    if report.all_deleted() {
        history.remove(id);
        DeleteOutcome::Removed
    } else if report.succeeded == 0 {
        DeleteOutcome::Failed {
            errors: report.errors,
        }
    } else {
        history.replace(report.record.clone());
        DeleteOutcome::Partial {
            errors: report.errors,
            record: report.record,
        }
    }
}

/// Delete record `id` and its files.
pub fn delete_record(
    store: &RecordStore,
    probe: &dyn FileProbe,
    id: &str,
) -> Result<DeleteOutcome, StoreError> {
    let outcome = store.update(|history| {
        let outcome = apply_deletion(history, probe, id);
        match outcome {
            DeleteOutcome::Removed | DeleteOutcome::Partial { .. } => Mutation::Save(outcome),
            DeleteOutcome::NotFound | DeleteOutcome::Failed { .. } => Mutation::Discard(outcome),
        }
    })?;

    match &outcome {
        DeleteOutcome::NotFound => debug!("Delete requested for unknown record {id}"),
        DeleteOutcome::Removed => info!("Deleted record {id} and its files"),
        DeleteOutcome::Partial { errors, .. } => {
            warn!("Record {id} partially deleted, {} file(s) left", errors.len())
        }
        DeleteOutcome::Failed { errors } => {
            warn!("Could not delete any file of record {id} ({} error(s))", errors.len())
        }
    }
    Ok(outcome)
}
