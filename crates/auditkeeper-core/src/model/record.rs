/// A single completed analysis and the files it references.
///
/// Records are the unit of the persisted history. Only the output workbook
/// and the optional offsite-pool workbook are *tracked*: the reconciler and
/// the deletion engine keep their `deleted` / `delete_error` flags honest.
/// The input file is informational and never touched.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Note stored on a tracked file that disappeared without going through
/// the deletion engine.
pub const REMOVED_EXTERNALLY: &str = "removed externally";

/// Fund-tracing algorithm that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    #[serde(rename = "FIFO")]
    Fifo,
    #[serde(rename = "BALANCE_METHOD")]
    BalanceMethod,
}

impl Algorithm {
    /// Label used as the first segment of generated output filenames.
    pub fn file_label(self) -> &'static str {
        match self {
            Self::Fifo => "FIFO",
            Self::BalanceMethod => "BalanceMethod",
        }
    }

    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Fifo => "FIFO",
            Self::BalanceMethod => "Balance method",
        }
    }
}

/// Outcome of the analysis run itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Success,
    Failed,
    Processing,
}

impl RecordStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failed => "Failed",
            Self::Processing => "Processing",
        }
    }
}

/// Which of a record's tracked files a message refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    Output,
    OffsitePool,
}

impl FileRole {
    pub fn label(self) -> &'static str {
        match self {
            Self::Output => "output file",
            Self::OffsitePool => "offsite pool file",
        }
    }
}

/// The spreadsheet the analysis read. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputFile {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub size: u64,
}

impl InputFile {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        Self {
            name: display_name(&path),
            path,
            size,
        }
    }
}

/// A result file whose existence is tracked against the metadata.
///
/// `deleted` and `delete_error` are never both set: a confirmed absence
/// clears the error, and a failed removal leaves `deleted` false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedFile {
    pub name: String,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_error: Option<String>,
    /// Free-form note set by reconciliation (e.g. [`REMOVED_EXTERNALLY`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl TrackedFile {
    /// Track a file at `path`; the display name is derived from the path.
    pub fn new(path: impl Into<PathBuf>, size: Option<u64>) -> Self {
        let path = path.into();
        Self {
            name: display_name(&path),
            path,
            size,
            deleted: false,
            delete_error: None,
            note: None,
        }
    }

    /// Neither deleted nor stuck on a failed deletion.
    pub fn is_live(&self) -> bool {
        !self.deleted && self.delete_error.is_none()
    }

    /// Record a confirmed absence after a successful (or unnecessary) removal.
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
        self.delete_error = None;
    }

    /// Record an absence nobody in this application caused.
    pub fn mark_removed_externally(&mut self) {
        self.mark_deleted();
        self.note = Some(REMOVED_EXTERNALLY.to_owned());
    }

    /// The file is back on disk; drop every deletion marker.
    pub fn mark_present(&mut self) {
        self.deleted = false;
        self.delete_error = None;
        self.note = None;
    }

    /// A removal attempt failed while the file still exists.
    pub fn mark_delete_failed(&mut self, reason: impl Into<String>) {
        self.deleted = false;
        self.delete_error = Some(reason.into());
    }
}

/// Counters reported by the analysis engine. Immutable once recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_records: u64,
    pub processing_time_ms: u64,
    pub validation_errors: u64,
    pub validation_fixes: u64,
}

/// Derived financial totals shown alongside a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    pub total_inflow: f64,
    pub total_outflow: f64,
    pub final_balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub misappropriation_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advance_amount: Option<f64>,
}

/// One completed analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub algorithm: Algorithm,
    pub input_file: InputFile,
    pub output_file: TrackedFile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offsite_pool_file: Option<TrackedFile>,
    pub statistics: Statistics,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<FinancialSummary>,
}

impl AnalysisRecord {
    /// Create a record with a fresh id, stamped with the current time.
    pub fn new(
        algorithm: Algorithm,
        input_file: InputFile,
        output_file: TrackedFile,
        statistics: Statistics,
        status: RecordStatus,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            algorithm,
            input_file,
            output_file,
            offsite_pool_file: None,
            statistics,
            status,
            summary: None,
        }
    }

    pub fn with_offsite_pool_file(mut self, file: TrackedFile) -> Self {
        self.offsite_pool_file = Some(file);
        self
    }

    pub fn with_summary(mut self, summary: FinancialSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Override the creation time (used when importing older results).
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Every tracked file reference, output first.
    pub fn tracked_files(&self) -> impl Iterator<Item = (FileRole, &TrackedFile)> {
        std::iter::once((FileRole::Output, &self.output_file)).chain(
            self.offsite_pool_file
                .as_ref()
                .map(|file| (FileRole::OffsitePool, file)),
        )
    }

    /// Mutable access to every tracked file reference, output first.
    pub fn tracked_files_mut(&mut self) -> impl Iterator<Item = (FileRole, &mut TrackedFile)> {
        std::iter::once((FileRole::Output, &mut self.output_file)).chain(
            self.offsite_pool_file
                .as_mut()
                .map(|file| (FileRole::OffsitePool, file)),
        )
    }

    /// At least one tracked file is neither deleted nor erroring.
    pub fn is_live(&self) -> bool {
        self.tracked_files().any(|(_, file)| file.is_live())
    }

    /// Every tracked file is confirmed absent; the record can be pruned.
    pub fn is_fully_deleted(&self) -> bool {
        self.tracked_files().all(|(_, file)| file.deleted)
    }

    pub fn has_delete_errors(&self) -> bool {
        self.tracked_files()
            .any(|(_, file)| file.delete_error.is_some())
    }

    /// Bytes still occupied by tracked files that are not marked deleted.
    pub fn tracked_bytes(&self) -> u64 {
        self.tracked_files()
            .filter(|(_, file)| !file.deleted)
            .filter_map(|(_, file)| file.size)
            .sum()
    }

    /// Does any tracked reference point at `path`?
    pub fn references(&self, path: &Path) -> bool {
        self.tracked_files().any(|(_, file)| file.path == path)
    }
}

/// File name component of `path`, falling back to the whole path.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AnalysisRecord {
        AnalysisRecord::new(
            Algorithm::Fifo,
            InputFile::new("/in/ledger.xlsx", 2048),
            TrackedFile::new("/tmp/FIFO_ledger_20240101120000.xlsx", Some(100)),
            Statistics::default(),
            RecordStatus::Success,
        )
    }

    #[test]
    fn serialises_with_camel_case_keys_and_tagged_algorithm() {
        let record = sample();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["algorithm"], "FIFO");
        assert_eq!(json["status"], "success");
        assert_eq!(json["outputFile"]["name"], "FIFO_ledger_20240101120000.xlsx");
        assert!(json["outputFile"].get("deleted").is_none());
        assert!(json.get("offsitePoolFile").is_none());
        assert!(json["statistics"].get("processingTimeMs").is_some());
    }

    #[test]
    fn reads_records_with_optional_fields_missing() {
        let json = r#"{
            "id": "abc",
            "timestamp": "2024-03-01T08:30:00Z",
            "algorithm": "BALANCE_METHOD",
            "inputFile": {"name": "in.xlsx", "path": "/in/in.xlsx", "size": 5},
            "outputFile": {"name": "out.xlsx", "path": "/tmp/out.xlsx", "deleted": true},
            "statistics": {"totalRecords": 3, "processingTimeMs": 10, "validationErrors": 0, "validationFixes": 1},
            "status": "failed"
        }"#;
        let record: AnalysisRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.algorithm, Algorithm::BalanceMethod);
        assert!(record.output_file.deleted);
        assert!(record.output_file.size.is_none());
        assert!(record.offsite_pool_file.is_none());
        assert_eq!(record.status, RecordStatus::Failed);
    }

    #[test]
    fn marking_deleted_clears_a_previous_error() {
        let mut file = TrackedFile::new("/tmp/a.xlsx", None);
        file.mark_delete_failed("locked");
        assert!(!file.deleted);
        assert!(!file.is_live());

        file.mark_deleted();
        assert!(file.deleted);
        assert!(file.delete_error.is_none());
    }

    #[test]
    fn mark_present_drops_every_marker() {
        let mut file = TrackedFile::new("/tmp/a.xlsx", None);
        file.mark_removed_externally();
        assert_eq!(file.note.as_deref(), Some(REMOVED_EXTERNALLY));

        file.mark_present();
        assert!(file.is_live());
        assert!(file.note.is_none());
    }

    #[test]
    fn tracked_files_include_the_offsite_pool_when_present() {
        let record = sample();
        assert_eq!(record.tracked_files().count(), 1);

        let record = record.with_offsite_pool_file(TrackedFile::new("/tmp/pool.xlsx", Some(50)));
        let roles: Vec<FileRole> = record.tracked_files().map(|(role, _)| role).collect();
        assert_eq!(roles, vec![FileRole::Output, FileRole::OffsitePool]);
        assert_eq!(record.tracked_bytes(), 150);
    }

    #[test]
    fn liveness_and_pruning_follow_the_file_flags() {
        let mut record =
            sample().with_offsite_pool_file(TrackedFile::new("/tmp/pool.xlsx", None));
        assert!(record.is_live());
        assert!(!record.is_fully_deleted());

        record.output_file.mark_deleted();
        assert!(record.is_live(), "pool file is still live");

        record
            .offsite_pool_file
            .as_mut()
            .unwrap()
            .mark_delete_failed("in use");
        assert!(!record.is_live());
        assert!(record.has_delete_errors());
        assert!(!record.is_fully_deleted());
    }

    #[test]
    fn new_records_get_distinct_ids() {
        assert_ne!(sample().id, sample().id);
    }
}
