/// Schema-version marker (`audit_app_version` key).
///
/// Checked once at startup. When the marker is missing or names another
/// version, both history documents are discarded before anything reads
/// them; the settings document is left alone.
use super::{keys, write_json, KeyValueStore};
use crate::error::StoreError;
use tracing::{info, warn};

/// Version of the persisted history layout understood by this build.
pub const SCHEMA_VERSION: &str = "1.0";

/// What [`ensure_current`] found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaCheck {
    /// Marker matched; nothing touched.
    Current,
    /// First run: no marker and no history; the marker was written.
    Initialised,
    /// Stale or missing marker alongside existing history, which was cleared.
    Migrated { from: Option<String> },
}

/// Bring the repository to [`SCHEMA_VERSION`].
pub fn ensure_current(kv: &dyn KeyValueStore) -> Result<SchemaCheck, StoreError> {
    let stored = kv
        .get(keys::SCHEMA_VERSION)?
        .and_then(|text| serde_json::from_str::<String>(&text).ok());

    if stored.as_deref() == Some(SCHEMA_VERSION) {
        return Ok(SchemaCheck::Current);
    }

    let has_history =
        kv.get(keys::ANALYSIS_HISTORY)?.is_some() || kv.get(keys::QUERY_HISTORY)?.is_some();

    let check = if has_history {
        warn!(
            "History schema {:?} does not match {}; clearing stored history",
            stored, SCHEMA_VERSION
        );
        kv.remove(keys::ANALYSIS_HISTORY)?;
        kv.remove(keys::QUERY_HISTORY)?;
        SchemaCheck::Migrated { from: stored }
    } else {
        info!("Initialising history schema {}", SCHEMA_VERSION);
        SchemaCheck::Initialised
    };

    write_json(kv, keys::SCHEMA_VERSION, &SCHEMA_VERSION)?;
    Ok(check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn first_run_writes_the_marker() {
        let kv = MemoryStore::new();
        assert_eq!(ensure_current(&kv).unwrap(), SchemaCheck::Initialised);
        assert_eq!(ensure_current(&kv).unwrap(), SchemaCheck::Current);
    }

    #[test]
    fn stale_marker_clears_history_but_keeps_settings() {
        let kv = MemoryStore::new();
        kv.set(keys::SCHEMA_VERSION, r#""0.9""#).unwrap();
        kv.set(keys::ANALYSIS_HISTORY, "{}").unwrap();
        kv.set(keys::QUERY_HISTORY, "{}").unwrap();
        kv.set(keys::APP_SETTINGS, "{}").unwrap();

        let check = ensure_current(&kv).unwrap();
        assert_eq!(
            check,
            SchemaCheck::Migrated {
                from: Some("0.9".to_owned())
            }
        );
        assert!(kv.get(keys::ANALYSIS_HISTORY).unwrap().is_none());
        assert!(kv.get(keys::QUERY_HISTORY).unwrap().is_none());
        assert!(kv.get(keys::APP_SETTINGS).unwrap().is_some());
        assert_eq!(
            kv.get(keys::SCHEMA_VERSION).unwrap().as_deref(),
            Some(r#""1.0""#)
        );
    }
}
