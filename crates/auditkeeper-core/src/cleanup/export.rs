/// Export of history records and their result files to a snapshot folder.
///
/// Layout under the chosen destination:
///
/// ```text
/// 历史记录备份_<YYYYMMDD_HHMMSS>/
///     分析结果文件/    copied output and offsite-pool workbooks
///     备份清单.json    machine-readable manifest
///     使用说明.txt     human-readable summary
/// ```
///
/// Export only reads tracked files. Per-file problems (missing source, copy
/// failure) are collected in [`ExportReport::errors`] and the export carries
/// on; only failures to create the snapshot itself are returned as `Err`.
use crate::error::StoreError;
use crate::history::RecordStore;
use crate::model::{AnalysisRecord, FinancialSummary, Statistics};
use crate::naming::{backup_folder_name, numbered_file_name};
use crate::probe::FileProbe;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Sub-folder holding the copied workbooks ("analysis result files").
pub const RESULTS_DIR_NAME: &str = "分析结果文件";
/// Manifest file name ("backup manifest").
pub const MANIFEST_FILE_NAME: &str = "备份清单.json";
/// Summary file name ("instructions").
pub const README_FILE_NAME: &str = "使用说明.txt";

/// Hard export failures. Nothing has been deleted when one of these occurs.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create export folder {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteArtifact {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode the export manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A file that could not be exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFileError {
    pub record_id: String,
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedFile {
    pub role: String,
    pub original_path: PathBuf,
    /// Name inside the results sub-folder.
    pub exported_name: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub algorithm: String,
    pub status: String,
    pub input_file_name: String,
    pub statistics: Statistics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<FinancialSummary>,
    pub exported_files: Vec<ExportedFile>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestTotals {
    pub record_count: usize,
    pub exported_files: usize,
    pub exported_bytes: u64,
    pub failed_files: usize,
}

/// Contents of `备份清单.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportManifest {
    pub application: String,
    pub application_version: String,
    pub export_time: DateTime<Utc>,
    pub cutoff: DateTime<Utc>,
    pub records: Vec<ManifestRecord>,
    pub totals: ManifestTotals,
    pub errors: Vec<ExportFileError>,
}

/// What [`export_records`] produced.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub backup_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub readme_path: PathBuf,
    pub record_count: usize,
    pub exported_files: usize,
    pub exported_bytes: u64,
    pub errors: Vec<ExportFileError>,
}

impl ExportReport {
    /// Every selected file made it into the snapshot.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Export every record with `timestamp <= cutoff` into a new snapshot
/// folder under `destination`.
pub fn export_records(
    store: &RecordStore,
    probe: &dyn FileProbe,
    destination: &Path,
    cutoff: DateTime<Utc>,
) -> Result<ExportReport, ExportError> {
    let records: Vec<AnalysisRecord> = store
        .load()
        .records
        .into_iter()
        .filter(|r| r.timestamp <= cutoff)
        .collect();

    let backup_dir = unique_backup_dir(probe, destination, Local::now())?;
    let results_dir = backup_dir.join(RESULTS_DIR_NAME);
    probe
        .create_dir_all(&results_dir)
        .map_err(|source| ExportError::CreateDir {
            path: results_dir.clone(),
            source,
        })?;

    let mut used_names = HashSet::new();
    let mut manifest_records = Vec::with_capacity(records.len());
    let mut totals = ManifestTotals {
        record_count: records.len(),
        ..Default::default()
    };
    let mut errors = Vec::new();

    for record in &records {
        let mut exported_files = Vec::new();
        for (role, file) in record.tracked_files() {
            if file.deleted {
                continue;
            }
            let fail = |message: String| ExportFileError {
                record_id: record.id.clone(),
                path: file.path.clone(),
                message,
            };

            match probe.exists(&file.path) {
                Ok(true) => {}
                Ok(false) => {
                    errors.push(fail("source file is missing".to_owned()));
                    continue;
                }
                Err(e) => {
                    errors.push(fail(format!("could not check source file: {e}")));
                    continue;
                }
            }

            let exported_name = claim_name(&mut used_names, &file.name);
            match probe.copy(&file.path, &results_dir.join(&exported_name)) {
                Ok(size) => {
                    totals.exported_files += 1;
                    totals.exported_bytes += size;
                    exported_files.push(ExportedFile {
                        role: role.label().to_owned(),
                        original_path: file.path.clone(),
                        exported_name,
                        size,
                    });
                }
                Err(e) => {
                    used_names.remove(&exported_name.to_lowercase());
                    errors.push(fail(format!("copy failed: {e}")));
                }
            }
        }

        manifest_records.push(ManifestRecord {
            id: record.id.clone(),
            timestamp: record.timestamp,
            algorithm: record.algorithm.label().to_owned(),
            status: record.status.label().to_owned(),
            input_file_name: record.input_file.name.clone(),
            statistics: record.statistics,
            summary: record.summary.clone(),
            exported_files,
        });
    }
    totals.failed_files = errors.len();

    for error in &errors {
        warn!(
            "Export of {} (record {}) failed: {}",
            error.path.display(),
            error.record_id,
            error.message
        );
    }

    let manifest = ExportManifest {
        application: "AuditKeeper".to_owned(),
        application_version: env!("CARGO_PKG_VERSION").to_owned(),
        export_time: Utc::now(),
        cutoff,
        records: manifest_records,
        totals,
        errors: errors.clone(),
    };

    let manifest_path = backup_dir.join(MANIFEST_FILE_NAME);
    let manifest_json = serde_json::to_vec_pretty(&manifest)?;
    write_artifact(probe, &manifest_path, &manifest_json)?;

    let readme_path = backup_dir.join(README_FILE_NAME);
    write_artifact(probe, &readme_path, render_readme(&manifest).as_bytes())?;

    info!(
        "Exported {} record(s), {} file(s) to {} ({} failure(s))",
        totals.record_count,
        totals.exported_files,
        backup_dir.display(),
        totals.failed_files
    );

    Ok(ExportReport {
        backup_dir,
        manifest_path,
        readme_path,
        record_count: totals.record_count,
        exported_files: totals.exported_files,
        exported_bytes: totals.exported_bytes,
        errors,
    })
}

/// `destination/历史记录备份_<ts>`, suffixed `_2`, `_3`, ... if taken.
///
/// A candidate whose existence cannot be checked is an error: writing into
/// it could overwrite an earlier snapshot.
fn unique_backup_dir(
    probe: &dyn FileProbe,
    destination: &Path,
    at: DateTime<Local>,
) -> Result<PathBuf, ExportError> {
    let base = backup_folder_name(&at);
    let mut candidate = destination.join(&base);
    let mut n = 2;
    loop {
        match probe.exists(&candidate) {
            Ok(false) => return Ok(candidate),
            Ok(true) => {
                candidate = destination.join(format!("{base}_{n}"));
                n += 1;
            }
            Err(source) => {
                return Err(ExportError::CreateDir {
                    path: candidate,
                    source,
                })
            }
        }
    }
}

/// First free variant of `name`, compared case-insensitively.
fn claim_name(used: &mut HashSet<String>, name: &str) -> String {
    let mut candidate = name.to_owned();
    let mut n = 1;
    while !used.insert(candidate.to_lowercase()) {
        candidate = numbered_file_name(name, n);
        n += 1;
    }
    candidate
}

fn write_artifact(probe: &dyn FileProbe, path: &Path, contents: &[u8]) -> Result<(), ExportError> {
    probe
        .write(path, contents)
        .map_err(|source| ExportError::WriteArtifact {
            path: path.to_path_buf(),
            source,
        })
}

fn render_readme(manifest: &ExportManifest) -> String {
    let local = |t: DateTime<Utc>| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
    let mut text = String::new();

    let _ = writeln!(text, "AuditKeeper history export");
    let _ = writeln!(text, "==========================");
    let _ = writeln!(text);
    let _ = writeln!(text, "Exported at:  {}", local(manifest.export_time));
    let _ = writeln!(text, "Records up to: {}", local(manifest.cutoff));
    let _ = writeln!(text, "Records:      {}", manifest.totals.record_count);
    let _ = writeln!(
        text,
        "Files copied: {} ({})",
        manifest.totals.exported_files,
        crate::model::size::format_size(manifest.totals.exported_bytes)
    );
    let _ = writeln!(text, "Failures:     {}", manifest.totals.failed_files);
    let _ = writeln!(text);
    let _ = writeln!(text, "Contents");
    let _ = writeln!(text, "--------");
    let _ = writeln!(
        text,
        "{RESULTS_DIR_NAME}/  result workbooks copied from the analysis history"
    );
    let _ = writeln!(
        text,
        "{MANIFEST_FILE_NAME}  one entry per record with statistics and copied file names"
    );
    let _ = writeln!(text, "{README_FILE_NAME}  this summary");

    if !manifest.errors.is_empty() {
        let _ = writeln!(text);
        let _ = writeln!(text, "Files that could not be exported");
        let _ = writeln!(text, "--------------------------------");
        for error in &manifest.errors {
            let _ = writeln!(text, "{}: {}", error.path.display(), error.message);
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claimed_names_get_numbered_on_collision() {
        let mut used = HashSet::new();
        assert_eq!(claim_name(&mut used, "a.xlsx"), "a.xlsx");
        assert_eq!(claim_name(&mut used, "A.xlsx"), "A (1).xlsx");
        assert_eq!(claim_name(&mut used, "a.xlsx"), "a (2).xlsx");
    }

    #[test]
    fn backup_dir_is_suffixed_when_taken() {
        let tmp = tempfile::TempDir::new().unwrap();
        let probe = crate::probe::LocalProbe::new();
        let at = Local::now();

        let first = unique_backup_dir(&probe, tmp.path(), at).unwrap();
        std::fs::create_dir_all(&first).unwrap();
        let second = unique_backup_dir(&probe, tmp.path(), at).unwrap();

        assert_ne!(first, second);
        assert!(second
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("_2"));
    }

    #[test]
    fn unreadable_backup_dir_is_not_treated_as_free() {
        let tmp = tempfile::TempDir::new().unwrap();
        let probe = crate::probe::test_support::FaultyProbe::new();
        let at = Local::now();
        let candidate = tmp.path().join(backup_folder_name(&at));
        probe.make_unstatable(candidate.clone());

        match unique_backup_dir(&probe, tmp.path(), at) {
            Err(ExportError::CreateDir { path, .. }) => assert_eq!(path, candidate),
            other => panic!("expected CreateDir, got {other:?}"),
        }
    }

    #[test]
    fn readme_lists_failures() {
        let manifest = ExportManifest {
            application: "AuditKeeper".into(),
            application_version: "0.1.0".into(),
            export_time: Utc::now(),
            cutoff: Utc::now(),
            records: Vec::new(),
            totals: ManifestTotals::default(),
            errors: vec![ExportFileError {
                record_id: "r1".into(),
                path: PathBuf::from("/tmp/locked.xlsx"),
                message: "copy failed: access is denied".into(),
            }],
        };
        let text = render_readme(&manifest);
        assert!(text.contains("/tmp/locked.xlsx: copy failed"));
        assert!(text.contains(MANIFEST_FILE_NAME));
    }
}
