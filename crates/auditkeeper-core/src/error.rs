/// Hard failures of the persistent key-value repository.
///
/// Everything else (missing files, locked files, copy failures) is caught at
/// the smallest scope and reported inside structured outcomes instead.
use std::path::PathBuf;
use thiserror::Error;

/// Errors that escape a component boundary as `Err`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No platform data directory could be resolved.
    #[error("no suitable data directory available for AuditKeeper")]
    NoDataDir,

    /// A stored value could not be read back from disk.
    #[error("failed to read `{key}` from {path}: {source}")]
    Read {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be written to disk.
    #[error("failed to write `{key}` to {path}: {source}")]
    Write {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be encoded as JSON.
    #[error("failed to serialise `{key}`: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// The storage key involved, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::NoDataDir => None,
            Self::Read { key, .. } | Self::Write { key, .. } | Self::Serialize { key, .. } => {
                Some(key)
            }
        }
    }
}
