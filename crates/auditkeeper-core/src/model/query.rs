/// Query-history records (`audit_app_query_history` key).
///
/// A query looks up the traced balance of a single ledger row. Queries
/// reference no tracked files; they are deduplicated by the
/// `(file_name, row_number, algorithm)` coordinate.
use super::record::Algorithm;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Version written into the saved query-history container.
pub const QUERY_HISTORY_VERSION: &str = "1.0";

/// What a row query produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum QueryOutcome {
    Success { summary: String },
    Failed { message: String },
}

impl QueryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryHistoryRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    pub row_number: u64,
    pub algorithm: Algorithm,
    pub outcome: QueryOutcome,
}

impl QueryHistoryRecord {
    pub fn new(
        file_name: impl Into<String>,
        row_number: u64,
        algorithm: Algorithm,
        outcome: QueryOutcome,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            file_name: file_name.into(),
            file_path: None,
            row_number,
            algorithm,
            outcome,
        }
    }

    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Same file, same row, same algorithm.
    pub fn same_coordinate(&self, other: &Self) -> bool {
        self.file_name == other.file_name
            && self.row_number == other.row_number
            && self.algorithm == other.algorithm
    }
}

/// Persisted query-history container, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryHistory {
    pub data: Vec<QueryHistoryRecord>,
    #[serde(default)]
    pub version: String,
    pub saved_at: DateTime<Utc>,
    pub count: usize,
    pub max_allowed: usize,
}

impl QueryHistory {
    pub fn empty(max_allowed: usize) -> Self {
        Self {
            data: Vec::new(),
            version: QUERY_HISTORY_VERSION.to_owned(),
            saved_at: Utc::now(),
            count: 0,
            max_allowed,
        }
    }
}
