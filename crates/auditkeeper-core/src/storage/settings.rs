/// User settings (`app-settings` key).
///
/// The settings document is shared with the rest of the desktop application,
/// so keys this crate does not know about are preserved on write. The
/// history bound is read through [`SettingsStore::max_history_records`] on
/// every call; nothing caches it.
use super::{keys, write_json, SharedStore};
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_MAX_HISTORY_RECORDS: usize = 50;
pub const MIN_HISTORY_RECORDS: usize = 1;
pub const MAX_HISTORY_RECORDS: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub max_history_records: usize,
    pub dark_mode: bool,
    pub confirm_before_delete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_export_dir: Option<PathBuf>,
    /// Keys owned by other parts of the application.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            max_history_records: DEFAULT_MAX_HISTORY_RECORDS,
            dark_mode: true,
            confirm_before_delete: true,
            last_export_dir: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl AppSettings {
    /// The history bound, clamped to a sane range.
    pub fn effective_max_history_records(&self) -> usize {
        self.max_history_records
            .clamp(MIN_HISTORY_RECORDS, MAX_HISTORY_RECORDS)
    }
}

/// Reads and writes [`AppSettings`] through the shared repository.
#[derive(Clone)]
pub struct SettingsStore {
    kv: SharedStore,
}

impl SettingsStore {
    pub fn new(kv: SharedStore) -> Self {
        Self { kv }
    }

    /// Current settings. Unreadable or malformed documents yield defaults.
    pub fn load(&self) -> AppSettings {
        let text = match self.kv.get(keys::APP_SETTINGS) {
            Ok(Some(text)) => text,
            Ok(None) => return AppSettings::default(),
            Err(e) => {
                warn!("Could not read settings, using defaults: {e}");
                return AppSettings::default();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!("Malformed settings document, using defaults: {e}");
            AppSettings::default()
        })
    }

    pub fn save(&self, settings: &AppSettings) -> Result<(), StoreError> {
        write_json(self.kv.as_ref(), keys::APP_SETTINGS, settings)
    }

    /// The live history bound, read from the repository on every call.
    pub fn max_history_records(&self) -> usize {
        self.load().effective_max_history_records()
    }

    /// Update only the history bound, keeping every other key.
    pub fn set_max_history_records(&self, max: usize) -> Result<(), StoreError> {
        let mut settings = self.load();
        settings.max_history_records = max.clamp(MIN_HISTORY_RECORDS, MAX_HISTORY_RECORDS);
        self.save(&settings)
    }
}
