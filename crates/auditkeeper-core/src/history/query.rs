/// Query-history store (`audit_app_query_history` key).
///
/// Newest first, at most [`MAX_QUERY_HISTORY`] entries. Re-querying an
/// existing `(file, row, algorithm)` coordinate refreshes that entry and
/// moves it to the front rather than adding a duplicate.
use crate::error::StoreError;
use crate::model::{QueryHistory, QueryHistoryRecord, QUERY_HISTORY_VERSION};
use crate::storage::{keys, write_json, SharedStore};
use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, warn};

pub const MAX_QUERY_HISTORY: usize = 100;

pub struct QueryHistoryStore {
    kv: SharedStore,
    writer: Mutex<()>,
}

impl QueryHistoryStore {
    pub fn new(kv: SharedStore) -> Self {
        Self {
            kv,
            writer: Mutex::new(()),
        }
    }

    /// Current container; fails soft like the analysis history.
    pub fn load(&self) -> QueryHistory {
        let text = match self.kv.get(keys::QUERY_HISTORY) {
            Ok(Some(text)) => text,
            Ok(None) => return QueryHistory::empty(MAX_QUERY_HISTORY),
            Err(e) => {
                warn!("Could not read query history: {e}");
                return QueryHistory::empty(MAX_QUERY_HISTORY);
            }
        };

        match serde_json::from_str::<QueryHistory>(&text) {
            Ok(history) if history.version == QUERY_HISTORY_VERSION => history,
            Ok(history) => {
                warn!(
                    "Query history version {:?} does not match {}; discarding",
                    history.version, QUERY_HISTORY_VERSION
                );
                self.discard_stored();
                QueryHistory::empty(MAX_QUERY_HISTORY)
            }
            Err(e) => {
                warn!("Query history is corrupt; discarding: {e}");
                self.discard_stored();
                QueryHistory::empty(MAX_QUERY_HISTORY)
            }
        }
    }

    /// Record a query, replacing any entry with the same coordinate.
    pub fn add_query(&self, record: QueryHistoryRecord) -> Result<(), StoreError> {
        let _guard = self.writer.lock();
        let mut history = self.load();

        let before = history.data.len();
        history.data.retain(|existing| !existing.same_coordinate(&record));
        if history.data.len() != before {
            debug!(
                "Refreshing query {} row {} ({})",
                record.file_name,
                record.row_number,
                record.algorithm.label()
            );
        }
        history.data.insert(0, record);
        history.data.truncate(MAX_QUERY_HISTORY);
        self.write(history)
    }

    pub fn delete_query(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.writer.lock();
        let mut history = self.load();
        let before = history.data.len();
        history.data.retain(|q| q.id != id);
        if history.data.len() == before {
            return Ok(false);
        }
        self.write(history)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.writer.lock();
        self.kv.remove(keys::QUERY_HISTORY)
    }

    /// Keep only entries matching `keep`; returns how many were dropped.
    pub fn retain(
        &self,
        mut keep: impl FnMut(&QueryHistoryRecord) -> bool,
    ) -> Result<usize, StoreError> {
        let _guard = self.writer.lock();
        let mut history = self.load();
        let before = history.data.len();
        history.data.retain(|q| keep(q));
        let removed = before - history.data.len();
        if removed > 0 {
            self.write(history)?;
        }
        Ok(removed)
    }

    fn write(&self, mut history: QueryHistory) -> Result<(), StoreError> {
        history.version = QUERY_HISTORY_VERSION.to_owned();
        history.saved_at = Utc::now();
        history.count = history.data.len();
        history.max_allowed = MAX_QUERY_HISTORY;
        write_json(self.kv.as_ref(), keys::QUERY_HISTORY, &history)
    }

    fn discard_stored(&self) {
        if let Err(e) = self.kv.remove(keys::QUERY_HISTORY) {
            warn!("Could not remove unusable query history: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Algorithm, QueryOutcome};
    use crate::storage::{KeyValueStore, MemoryStore};
    use std::sync::Arc;

    fn store() -> (Arc<MemoryStore>, QueryHistoryStore) {
        let kv = Arc::new(MemoryStore::new());
        (kv.clone(), QueryHistoryStore::new(kv))
    }

    fn query(file: &str, row: u64, algorithm: Algorithm) -> QueryHistoryRecord {
        QueryHistoryRecord::new(
            file,
            row,
            algorithm,
            QueryOutcome::Success {
                summary: format!("row {row}"),
            },
        )
    }

    #[test]
    fn same_coordinate_moves_to_front_without_duplicating() {
        let (_, store) = store();
        store.add_query(query("a.xlsx", 1, Algorithm::Fifo)).unwrap();
        store.add_query(query("b.xlsx", 2, Algorithm::Fifo)).unwrap();

        let again = QueryHistoryRecord::new(
            "a.xlsx",
            1,
            Algorithm::Fifo,
            QueryOutcome::Failed {
                message: "sheet missing".into(),
            },
        );
        store.add_query(again.clone()).unwrap();

        let history = store.load();
        assert_eq!(history.data.len(), 2);
        assert_eq!(history.data[0].id, again.id);
        assert!(!history.data[0].outcome.is_success());
        assert_eq!(history.count, 2);
    }

    #[test]
    fn different_algorithm_is_a_different_coordinate() {
        let (_, store) = store();
        store.add_query(query("a.xlsx", 1, Algorithm::Fifo)).unwrap();
        store
            .add_query(query("a.xlsx", 1, Algorithm::BalanceMethod))
            .unwrap();
        assert_eq!(store.load().data.len(), 2);
    }

    #[test]
    fn bounded_to_the_newest_entries() {
        let (_, store) = store();
        for row in 0..(MAX_QUERY_HISTORY as u64 + 5) {
            store.add_query(query("a.xlsx", row, Algorithm::Fifo)).unwrap();
        }
        let history = store.load();
        assert_eq!(history.data.len(), MAX_QUERY_HISTORY);
        assert_eq!(history.data[0].row_number, MAX_QUERY_HISTORY as u64 + 4);
        assert_eq!(history.max_allowed, MAX_QUERY_HISTORY);
    }

    #[test]
    fn delete_and_retain() {
        let (_, store) = store();
        let keep = query("keep.xlsx", 1, Algorithm::Fifo);
        let drop = query("drop.xlsx", 2, Algorithm::Fifo);
        store.add_query(keep.clone()).unwrap();
        store.add_query(drop.clone()).unwrap();

        assert_eq!(store.retain(|q| q.file_name == "keep.xlsx").unwrap(), 1);
        assert!(!store.delete_query(&drop.id).unwrap());
        assert!(store.delete_query(&keep.id).unwrap());
        assert!(store.load().data.is_empty());
    }

    #[test]
    fn corrupt_document_loads_empty() {
        let (kv, store) = store();
        kv.set(keys::QUERY_HISTORY, "not json").unwrap();
        assert!(store.load().data.is_empty());
        assert!(kv.get(keys::QUERY_HISTORY).unwrap().is_none());
    }
}
