//! Storage-specific error type wrapping IO and JSON errors.

use std::path::PathBuf;

use homereg_domain::error::RegistryError;

/// Errors originating from the JSON storage layer.
#[derive(Debug, thiserror::Error)]
pub enum JsonStorageError {
    /// Reading, writing or renaming a file failed.
    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A storage file does not hold a JSON object of the expected values.
    #[error("invalid JSON in {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl JsonStorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

impl From<JsonStorageError> for RegistryError {
    fn from(err: JsonStorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
