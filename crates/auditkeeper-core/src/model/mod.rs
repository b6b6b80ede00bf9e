/// Data model for the AuditKeeper history.
///
/// Re-exports the record types and the persisted containers that hold them.
pub mod history;
pub mod query;
pub mod record;
pub mod size;

pub use history::{AnalysisHistory, HISTORY_VERSION};
pub use query::{QueryHistory, QueryHistoryRecord, QueryOutcome, QUERY_HISTORY_VERSION};
pub use record::{
    Algorithm, AnalysisRecord, FileRole, FinancialSummary, InputFile, RecordStatus, Statistics,
    TrackedFile,
};
