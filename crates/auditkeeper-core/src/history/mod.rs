/// Record stores, the only writers of the persisted history documents.
///
/// [`RecordStore`] owns the `analysis-history` document and
/// [`QueryHistoryStore`] owns `audit_app_query_history`. Both load fail-soft:
/// a corrupt or stale document is discarded and an empty container returned.
///
/// Read-modify-write sequences go through [`RecordStore::update`], which holds
/// a process-wide writer lock for the whole sequence. The lock is shared by
/// every `RecordStore` in the process, so concurrent user actions (a delete
/// issued while a sync is running, or two stores opened over the same
/// repository) apply one after the other instead of overwriting each other's
/// results.
///
/// Only [`RecordStore::save`] and [`RecordStore::enforce_limit`] evict past
/// the bound. `update` writes the container as the closure left it, so a
/// user-scoped delete or a reconcile never removes records it was not asked
/// to touch.
pub mod query;

pub use query::{QueryHistoryStore, MAX_QUERY_HISTORY};

use crate::error::StoreError;
use crate::model::{AnalysisHistory, AnalysisRecord, RecordStatus, HISTORY_VERSION};
use crate::probe::{remove_if_present, SharedProbe};
use crate::storage::{keys, write_json, SettingsStore, SharedStore};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// Serializes every history write in the process.
static WRITER: Mutex<()> = Mutex::new(());

/// Result of [`RecordStore::add_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddRecordOutcome {
    /// The history now holds more records than the user allows; the caller
    /// should offer cleanup. The over-limit state has been persisted.
    pub needs_cleanup: bool,
    pub current_count: usize,
    pub max_records: usize,
}

/// Result of a bounded [`RecordStore::save`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub record_count: usize,
    /// Ids of records evicted from the tail.
    pub evicted: Vec<String>,
    /// Files of evicted records that could not be removed.
    pub eviction_errors: Vec<String>,
}

/// What an [`RecordStore::update`] closure wants done with the container.
#[derive(Debug)]
pub enum Mutation<R> {
    /// Persist the modified container as is. No eviction.
    Save(R),
    /// Nothing changed; skip the write.
    Discard(R),
}

/// Aggregate counts over the current history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStatistics {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Records with at least one live tracked file.
    pub live: usize,
    /// Records whose tracked files are all gone.
    pub fully_deleted: usize,
    pub with_delete_errors: usize,
    pub tracked_bytes: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// Persistent, size-bounded table of analysis records.
pub struct RecordStore {
    kv: SharedStore,
    settings: SettingsStore,
    /// Used only to delete the files of evicted records.
    probe: SharedProbe,
}

impl RecordStore {
    pub fn new(kv: SharedStore, settings: SettingsStore, probe: SharedProbe) -> Self {
        Self {
            kv,
            settings,
            probe,
        }
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Current container. Never fails: unreadable, corrupt, or
    /// wrong-version documents produce an empty container (and corrupt or
    /// stale ones are removed).
    pub fn load(&self) -> AnalysisHistory {
        let max = self.settings.max_history_records();
        let text = match self.kv.get(keys::ANALYSIS_HISTORY) {
            Ok(Some(text)) => text,
            Ok(None) => return AnalysisHistory::empty(max),
            Err(e) => {
                warn!("Could not read analysis history: {e}");
                return AnalysisHistory::empty(max);
            }
        };

        match serde_json::from_str::<AnalysisHistory>(&text) {
            Ok(history) if history.version == HISTORY_VERSION => history,
            Ok(history) => {
                warn!(
                    "Analysis history version {:?} does not match {}; discarding",
                    history.version, HISTORY_VERSION
                );
                self.discard_stored();
                AnalysisHistory::empty(max)
            }
            Err(e) => {
                warn!("Analysis history is corrupt; discarding: {e}");
                self.discard_stored();
                AnalysisHistory::empty(max)
            }
        }
    }

    /// Persist `history`, evicting the oldest records past the user's bound.
    ///
    /// Evicted records' files are deleted best-effort after the metadata is
    /// written; failures are logged and reported, never fatal.
    pub fn save(&self, history: AnalysisHistory) -> Result<SaveReport, StoreError> {
        let _guard = WRITER.lock();
        self.save_bounded(history)
    }

    /// Remove the persisted history entirely.
    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = WRITER.lock();
        self.kv.remove(keys::ANALYSIS_HISTORY)?;
        info!("Analysis history cleared");
        Ok(())
    }

    /// Prepend `record` and persist without eviction.
    ///
    /// The bound is read from the settings store now, not cached. Exceeding
    /// it only sets `needs_cleanup`; nothing is evicted until the next
    /// bounded save, so the user decides what goes.
    pub fn add_record(&self, record: AnalysisRecord) -> Result<AddRecordOutcome, StoreError> {
        let _guard = WRITER.lock();
        let mut history = self.load();
        let id = record.id.clone();
        history.prepend(record);

        let max_records = self.settings.max_history_records();
        let current_count = history.len();
        self.write_unbounded(history)?;

        let needs_cleanup = current_count > max_records;
        if needs_cleanup {
            info!(
                "Added record {}; history holds {} of {} allowed, cleanup needed",
                id, current_count, max_records
            );
        } else {
            debug!("Added record {} ({} of {})", id, current_count, max_records);
        }
        Ok(AddRecordOutcome {
            needs_cleanup,
            current_count,
            max_records,
        })
    }

    /// Remove a record's metadata only. Files are not touched.
    ///
    /// Returns `false` for an unknown id.
    pub fn delete_record_entry(&self, id: &str) -> Result<bool, StoreError> {
        self.update(|history| match history.remove(id) {
            Some(_) => Mutation::Save(true),
            None => Mutation::Discard(false),
        })
    }

    pub fn get_record(&self, id: &str) -> Option<AnalysisRecord> {
        self.load().find(id).cloned()
    }

    /// Replace the stored record with the same id.
    pub fn update_record(&self, record: AnalysisRecord) -> Result<bool, StoreError> {
        self.update(|history| {
            if history.replace(record) {
                Mutation::Save(true)
            } else {
                Mutation::Discard(false)
            }
        })
    }

    /// Apply the bound now (the user accepted the cleanup prompt).
    pub fn enforce_limit(&self) -> Result<SaveReport, StoreError> {
        let _guard = WRITER.lock();
        let history = self.load();
        self.save_bounded(history)
    }

    /// Run a read-modify-write sequence under the writer lock.
    ///
    /// The bound is not applied here; records past it stay until the user
    /// trims. The closure must not call back into any record store.
    pub fn update<R>(
        &self,
        f: impl FnOnce(&mut AnalysisHistory) -> Mutation<R>,
    ) -> Result<R, StoreError> {
        let _guard = WRITER.lock();
        let mut history = self.load();
        match f(&mut history) {
            Mutation::Save(result) => {
                self.write_unbounded(history)?;
                Ok(result)
            }
            Mutation::Discard(result) => Ok(result),
        }
    }

    pub fn record_count(&self) -> usize {
        self.load().len()
    }

    pub fn statistics(&self) -> HistoryStatistics {
        let history = self.load();
        let mut stats = HistoryStatistics {
            total: history.len(),
            ..Default::default()
        };
        for record in &history.records {
            match record.status {
                RecordStatus::Success => stats.successful += 1,
                RecordStatus::Failed => stats.failed += 1,
                RecordStatus::Processing => {}
            }
            if record.is_live() {
                stats.live += 1;
            }
            if record.is_fully_deleted() {
                stats.fully_deleted += 1;
            }
            if record.has_delete_errors() {
                stats.with_delete_errors += 1;
            }
            stats.tracked_bytes += record.tracked_bytes();
        }
        stats.oldest = history.records.iter().map(|r| r.timestamp).min();
        stats.newest = history.records.iter().map(|r| r.timestamp).max();
        stats
    }

    // ── Internals (caller holds the writer lock) ────────────────────────────

    fn save_bounded(&self, mut history: AnalysisHistory) -> Result<SaveReport, StoreError> {
        let max = self.settings.max_history_records();
        history.max_records = max;
        let evicted = history.truncate_to(max);
        let record_count = history.len();

        self.write_unbounded(history)?;

        let eviction_errors = self.delete_evicted_files(&evicted);
        if !evicted.is_empty() {
            info!(
                "Evicted {} record(s) past the limit of {}",
                evicted.len(),
                max
            );
        }
        Ok(SaveReport {
            record_count,
            evicted: evicted.into_iter().map(|r| r.id).collect(),
            eviction_errors,
        })
    }

    fn write_unbounded(&self, mut history: AnalysisHistory) -> Result<(), StoreError> {
        history.max_records = self.settings.max_history_records();
        history.last_updated = Utc::now();
        history.version = HISTORY_VERSION.to_owned();
        write_json(self.kv.as_ref(), keys::ANALYSIS_HISTORY, &history)
    }

    fn delete_evicted_files(&self, evicted: &[AnalysisRecord]) -> Vec<String> {
        let mut errors = Vec::new();
        for record in evicted {
            for (role, file) in record.tracked_files() {
                if file.deleted {
                    continue;
                }
                if let Err(e) = remove_if_present(self.probe.as_ref(), &file.path) {
                    warn!(
                        "Could not remove {} of evicted record {}: {}",
                        role.label(),
                        record.id,
                        e
                    );
                    errors.push(format!("{}: {}", file.path.display(), e));
                }
            }
        }
        errors
    }

    fn discard_stored(&self) {
        if let Err(e) = self.kv.remove(keys::ANALYSIS_HISTORY) {
            warn!("Could not remove unusable analysis history: {e}");
        }
    }
}
