/// End-to-end tests for `AppState` — the GUI application state machine.
///
/// These exercise the real job paths of `AppState` without spinning up an
/// egui window: a `HistoryService` over an in-memory store and a temp
/// directory on the real filesystem, driven through the same calls the
/// widgets make.
use auditkeeper_core::jobs::Job;
use auditkeeper_core::model::{Algorithm, RecordStatus, Statistics};
use auditkeeper_core::probe::LocalProbe;
use auditkeeper_core::service::CompletedAnalysis;
use auditkeeper_core::storage::MemoryStore;
use auditkeeper_core::HistoryService;
use auditkeeper_gui::state::{AppPhase, AppState, StatusLevel};
use auditkeeper_gui::AuditKeeperState;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

// ── Helpers ───────────────────────────────────────────────────────────────────

struct Env {
    tmp: TempDir,
    service: Arc<HistoryService>,
}

fn env() -> Env {
    let tmp = TempDir::new().unwrap();
    let service = HistoryService::with_parts(
        Arc::new(MemoryStore::new()),
        Arc::new(LocalProbe::new()),
        tmp.path().join("temp_results"),
    );
    fs::create_dir_all(service.temp_dir()).unwrap();
    Env {
        tmp,
        service: Arc::new(service),
    }
}

impl Env {
    fn result_file(&self, name: &str, n: usize) -> PathBuf {
        let path = self.service.temp_dir().join(name);
        fs::write(&path, vec![0u8; n]).unwrap();
        path
    }

    fn record(&self, output: &Path) -> String {
        let (record, _) = self
            .service
            .record_completed_analysis(CompletedAnalysis {
                algorithm: Algorithm::Fifo,
                input_path: self.tmp.path().join("ledger.xlsx"),
                output_path: output.to_path_buf(),
                offsite_pool_path: None,
                statistics: Statistics::default(),
                status: RecordStatus::Success,
                summary: None,
            })
            .unwrap();
        record.id
    }

    fn backdate(&self, id: &str, days: i64) {
        let records = self.service.records();
        let mut record = records.get_record(id).unwrap();
        record.timestamp -= chrono::Duration::days(days);
        assert!(records.update_record(record).unwrap());
    }
}

/// Pump `process_job_messages()` until no job is running (follow-up jobs
/// included) or the deadline expires.
fn pump_until_idle(state: &mut AppState) {
    let deadline = Instant::now() + Duration::from_secs(30);
    while state.phase == AppPhase::Working {
        assert!(
            Instant::now() < deadline,
            "job did not complete within 30 seconds"
        );
        state.process_job_messages();
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn status_level(state: &AppState) -> StatusLevel {
    state.status.as_ref().expect("status must be set").level
}

// ── Startup ───────────────────────────────────────────────────────────────────

/// A new state shows what is already persisted, with default preferences.
#[test]
fn new_state_loads_history_and_settings() {
    let env = env();
    let out = env.result_file("a.xlsx", 10);
    let id = env.record(&out);

    let state = AppState::new(env.service.clone());
    assert_eq!(state.history.len(), 1);
    assert_eq!(state.history.records[0].id, id);
    assert_eq!(state.statistics.total, 1);
    assert_eq!(state.max_records, 50);
    assert!(state.dark_mode);
    assert!(state.confirm_before_delete);
    assert_eq!(state.phase, AppPhase::Idle);
}

/// The pre-built state kicks off a file check that flags drift.
#[test]
fn startup_sync_flags_missing_files() {
    let env = env();
    let out = env.result_file("gone.xlsx", 10);
    let id = env.record(&out);
    fs::remove_file(&out).unwrap();

    let mut state = AuditKeeperState::with_service(env.service.clone()).into_state();
    assert_eq!(state.phase, AppPhase::Working);
    pump_until_idle(&mut state);

    assert!(state.history.find(&id).unwrap().output_file.deleted);
    assert_eq!(status_level(&state), StatusLevel::Success);
    assert!(state.last_job_duration.is_some());
}

// ── Jobs ──────────────────────────────────────────────────────────────────────

/// Only one job runs at a time; the second request is refused until the
/// first has been drained.
#[test]
fn second_job_is_refused_while_busy() {
    let env = env();
    let mut state = AppState::new(env.service.clone());

    assert!(state.start_job(Job::SyncAll));
    assert!(state.is_busy());
    assert!(!state.start_job(Job::ScanOrphans));

    pump_until_idle(&mut state);
    assert!(state.start_job(Job::ScanOrphans));
    pump_until_idle(&mut state);
}

/// A hard failure surfaces as an error status, not a panic.
#[test]
fn failed_job_sets_error_status() {
    let env = env();
    let out = env.result_file("a.xlsx", 10);
    let id = env.record(&out);
    env.backdate(&id, 60);

    // A regular file cannot hold the backup folder.
    let blocker = env.tmp.path().join("not-a-dir");
    fs::write(&blocker, b"x").unwrap();

    let mut state = AppState::new(env.service.clone());
    state.set_export_destination(blocker);
    assert!(state.start_export_then_cleanup());
    pump_until_idle(&mut state);

    assert_eq!(status_level(&state), StatusLevel::Error);
    assert_eq!(state.history.len(), 1, "nothing may be deleted");
    assert!(out.exists());
}

// ── Deletion ──────────────────────────────────────────────────────────────────

/// With confirmation on, a delete waits for the user; cancelling keeps it.
#[test]
fn delete_goes_through_confirmation() {
    let env = env();
    let out = env.result_file("a.xlsx", 10);
    let id = env.record(&out);
    let mut state = AppState::new(env.service.clone());

    state.request_delete(id.clone());
    assert_eq!(state.pending_delete.as_deref(), Some(id.as_str()));
    assert!(!state.is_busy());

    state.cancel_delete();
    assert!(state.pending_delete.is_none());
    assert_eq!(state.history.len(), 1);

    state.request_delete(id.clone());
    state.confirm_delete();
    pump_until_idle(&mut state);

    assert!(state.history.is_empty());
    assert!(!out.exists());
    assert_eq!(status_level(&state), StatusLevel::Success);
}

/// With confirmation off, the job starts at once and the preference sticks.
#[test]
fn delete_without_confirmation_runs_immediately() {
    let env = env();
    let out = env.result_file("a.xlsx", 10);
    let id = env.record(&out);
    let mut state = AppState::new(env.service.clone());
    state.selected_record = Some(id.clone());

    state.set_confirm_before_delete(false);
    state.request_delete(id);
    assert!(state.is_busy());
    pump_until_idle(&mut state);

    assert!(state.history.is_empty());
    assert!(state.selected_record.is_none(), "selection must follow the history");
    assert!(!AppState::new(env.service.clone()).confirm_before_delete);
}

// ── Cleanup dialog ────────────────────────────────────────────────────────────

/// The preview counts only records older than the cutoff.
#[test]
fn cleanup_preview_follows_cutoff() {
    let env = env();
    let old = env.record(&env.result_file("old.xlsx", 100));
    env.record(&env.result_file("new.xlsx", 50));
    env.backdate(&old, 45);

    let mut state = AppState::new(env.service.clone());
    state.cleanup.cutoff_days = 30;
    state.open_cleanup_dialog();
    let preview = state.cleanup.preview.as_ref().unwrap();
    assert_eq!(preview.analysis.len(), 1);
    assert_eq!(preview.analysis[0].id, old);
    assert_eq!(preview.tracked_bytes(), 100);

    state.cleanup.cutoff_days = 60;
    state.update_cleanup_preview();
    assert!(state.cleanup.preview.as_ref().unwrap().analysis.is_empty());
}

/// Export-then-delete needs a folder; with one it backs up and removes the
/// old record only.
#[test]
fn export_then_cleanup_from_dialog() {
    let env = env();
    let old_file = env.result_file("old.xlsx", 100);
    let old = env.record(&old_file);
    let new = env.record(&env.result_file("new.xlsx", 50));
    env.backdate(&old, 45);

    let mut state = AppState::new(env.service.clone());
    state.open_cleanup_dialog();
    assert!(!state.start_export_then_cleanup());
    assert_eq!(status_level(&state), StatusLevel::Error);

    let backup_root = env.tmp.path().join("backups");
    fs::create_dir_all(&backup_root).unwrap();
    state.set_export_destination(backup_root.clone());
    assert!(state.start_export_then_cleanup());
    pump_until_idle(&mut state);

    assert_eq!(status_level(&state), StatusLevel::Success);
    assert_eq!(state.history.len(), 1);
    assert_eq!(state.history.records[0].id, new);
    assert!(!old_file.exists());
    assert_eq!(fs::read_dir(&backup_root).unwrap().count(), 1);
    assert_eq!(
        env.service.settings().load().last_export_dir,
        Some(backup_root)
    );
}

// ── Temp folder ───────────────────────────────────────────────────────────────

/// Opening the panel scans; removing safe files rescans automatically.
#[test]
fn orphan_panel_scan_and_cleanup() {
    let env = env();
    let live = env.result_file("live.xlsx", 10);
    env.record(&live);
    let stray = env.result_file("stray.xlsx", 30);

    let mut state = AppState::new(env.service.clone());
    state.toggle_orphan_panel();
    pump_until_idle(&mut state);

    assert_eq!(state.orphans.len(), 2);
    let stray_info = state.orphans.iter().find(|f| f.path == stray).unwrap();
    assert!(stray_info.can_safe_delete && !stray_info.is_tracked);

    state.start_job(Job::CleanupOrphans);
    pump_until_idle(&mut state);

    assert!(!stray.exists());
    assert!(live.exists());
    assert_eq!(state.orphans.len(), 1, "follow-up scan must refresh the list");
    assert_eq!(state.orphans[0].path, live);
}

// ── Preferences ───────────────────────────────────────────────────────────────

/// The theme choice is persisted in the shared settings document.
#[test]
fn theme_toggle_is_persisted() {
    let env = env();
    let mut state = AppState::new(env.service.clone());
    state.toggle_dark_mode();
    assert!(!state.dark_mode);
    assert!(!env.service.settings().load().dark_mode);
    assert!(!AppState::new(env.service.clone()).dark_mode);
}
