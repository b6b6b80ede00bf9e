//! Application directory resolution.
//!
//! Persisted history lives in a `store` folder and generated result files in
//! a `temp_results` folder, both under the OS data directory (e.g.
//! `%APPDATA%\AuditKeeper` on Windows). `AUDITKEEPER_DATA_HOME` overrides the
//! root for portable installs and tests.

use crate::error::StoreError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Environment variable that replaces the OS data directory.
pub const DATA_HOME_ENV: &str = "AUDITKEEPER_DATA_HOME";

const STORE_DIR_NAME: &str = "store";
const TEMP_RESULTS_DIR_NAME: &str = "temp_results";

/// Resolved on-disk locations used by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Root data directory.
    pub data_dir: PathBuf,
    /// Directory holding one JSON file per persisted key.
    pub store_dir: PathBuf,
    /// Directory the analysis engine writes result workbooks into.
    pub temp_results_dir: PathBuf,
}

impl AppPaths {
    /// Resolve paths from `AUDITKEEPER_DATA_HOME` or the OS data directory.
    pub fn resolve() -> Result<Self, StoreError> {
        if let Some(root) = std::env::var_os(DATA_HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::at(PathBuf::from(root)));
        }
        let dirs = ProjectDirs::from("com", "AuditKeeper", "AuditKeeper")
            .ok_or(StoreError::NoDataDir)?;
        Ok(Self::at(dirs.data_dir().to_path_buf()))
    }

    /// Lay out the standard sub-directories under an explicit root.
    pub fn at(root: impl AsRef<Path>) -> Self {
        let data_dir = root.as_ref().to_path_buf();
        Self {
            store_dir: data_dir.join(STORE_DIR_NAME),
            temp_results_dir: data_dir.join(TEMP_RESULTS_DIR_NAME),
            data_dir,
        }
    }

    /// Create the store and temp-results directories if they are missing.
    pub fn ensure_dirs(&self) -> Result<(), StoreError> {
        for dir in [&self.store_dir, &self.temp_results_dir] {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::Write {
                key: dir.display().to_string(),
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}
