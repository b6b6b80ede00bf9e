/// The persisted analysis-history container (`analysis-history` key).
///
/// Records are ordered newest first. `max_records` mirrors the user setting
/// at the time of the last bounded save; the store re-reads the live setting
/// rather than trusting this value.
use super::record::AnalysisRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version written into every saved container. A stored container
/// with any other version is discarded on load.
pub const HISTORY_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisHistory {
    pub records: Vec<AnalysisRecord>,
    pub max_records: usize,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub version: String,
}

impl AnalysisHistory {
    /// A fresh, current-version container with no records.
    pub fn empty(max_records: usize) -> Self {
        Self {
            records: Vec::new(),
            max_records,
            last_updated: Utc::now(),
            version: HISTORY_VERSION.to_owned(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert at the front (newest first).
    pub fn prepend(&mut self, record: AnalysisRecord) {
        self.records.insert(0, record);
    }

    pub fn find(&self, id: &str) -> Option<&AnalysisRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    /// Remove a record by id, returning it.
    pub fn remove(&mut self, id: &str) -> Option<AnalysisRecord> {
        self.position(id).map(|pos| self.records.remove(pos))
    }

    /// Replace the record with the same id in place. Returns `false` when
    /// no such record exists.
    pub fn replace(&mut self, record: AnalysisRecord) -> bool {
        match self.position(&record.id) {
            Some(pos) => {
                self.records[pos] = record;
                true
            }
            None => false,
        }
    }

    /// Split off everything past `max`, oldest last. Returns the evicted tail.
    pub fn truncate_to(&mut self, max: usize) -> Vec<AnalysisRecord> {
        if self.records.len() > max {
            self.records.split_off(max)
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::{Algorithm, InputFile, RecordStatus, Statistics, TrackedFile};

    fn record(name: &str) -> AnalysisRecord {
        AnalysisRecord::new(
            Algorithm::Fifo,
            InputFile::new(format!("/in/{name}.xlsx"), 1),
            TrackedFile::new(format!("/tmp/{name}.xlsx"), None),
            Statistics::default(),
            RecordStatus::Success,
        )
    }

    #[test]
    fn prepend_keeps_newest_first() {
        let mut history = AnalysisHistory::empty(10);
        let a = record("a");
        let b = record("b");
        history.prepend(a.clone());
        history.prepend(b.clone());
        assert_eq!(history.records[0].id, b.id);
        assert_eq!(history.records[1].id, a.id);
    }

    #[test]
    fn truncate_evicts_from_the_tail() {
        let mut history = AnalysisHistory::empty(10);
        let oldest = record("oldest");
        history.prepend(oldest.clone());
        history.prepend(record("middle"));
        history.prepend(record("newest"));

        let evicted = history.truncate_to(2);
        assert_eq!(history.len(), 2);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id, oldest.id);
        assert!(history.truncate_to(5).is_empty());
    }

    #[test]
    fn replace_and_remove_work_by_id() {
        let mut history = AnalysisHistory::empty(10);
        let mut a = record("a");
        history.prepend(a.clone());

        a.output_file.mark_deleted();
        assert!(history.replace(a.clone()));
        assert!(history.find(&a.id).unwrap().output_file.deleted);

        assert!(history.remove(&a.id).is_some());
        assert!(history.remove(&a.id).is_none());
        assert!(!history.replace(a));
    }
}
