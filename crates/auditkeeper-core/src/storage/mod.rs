/// Key-value persistence for AuditKeeper.
///
/// Every persisted value is a JSON document stored under a fixed key. The
/// stores above this layer receive the repository as an injected
/// [`SharedStore`] so that production uses [`JsonFileStore`] and tests use
/// [`MemoryStore`] without any other change.
pub mod json_file;
pub mod memory;
pub mod schema;
pub mod settings;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use settings::{AppSettings, SettingsStore};

use crate::error::StoreError;
use serde::Serialize;
use std::sync::Arc;

/// Well-known storage keys.
pub mod keys {
    pub const ANALYSIS_HISTORY: &str = "analysis-history";
    pub const QUERY_HISTORY: &str = "audit_app_query_history";
    pub const SCHEMA_VERSION: &str = "audit_app_version";
    pub const APP_SETTINGS: &str = "app-settings";
}

/// A string-keyed repository of JSON documents.
pub trait KeyValueStore: Send + Sync {
    /// Raw JSON text stored under `key`, or `None` if never written.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Repository handle shared between the stores of one application.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Serialise `value` and store it under `key`.
pub fn write_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let text = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize {
        key: key.to_owned(),
        source,
    })?;
    store.set(key, &text)
}
