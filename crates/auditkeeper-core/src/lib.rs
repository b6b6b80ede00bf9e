/// AuditKeeper Core — result history, drift reconciliation, and cleanup.
///
/// This crate contains all business logic with zero UI dependencies.
/// It keeps the persisted analysis history in step with the result files
/// on disk and is reusable across frontends (GUI, CLI, tests).
///
/// # Modules
///
/// - [`model`] — Analysis/query records and their persisted containers.
/// - [`storage`] — Key-value persistence, settings, and the schema marker.
/// - [`history`] — The record stores (analysis history, query history).
/// - [`probe`] — Filesystem capability trait used by everything above it.
/// - [`reconcile`] — Drift detection between records and files on disk.
/// - [`deletion`] — Per-record file deletion with partial-failure outcomes.
/// - [`cleanup`] — Time-range selection, bulk deletion, and export.
/// - [`naming`] — Result and backup file naming conventions.
/// - [`orphan`] — Temp-results directory scanner and orphan removal.
/// - [`jobs`] — Background execution of long-running operations.
/// - [`service`] — Bundles the components for a frontend.
pub mod cleanup;
pub mod deletion;
pub mod error;
pub mod history;
pub mod jobs;
pub mod model;
pub mod naming;
pub mod orphan;
pub mod paths;
pub mod probe;
pub mod reconcile;
pub mod service;
pub mod storage;

pub use error::StoreError;
pub use service::HistoryService;
