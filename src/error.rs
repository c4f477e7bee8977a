use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed engine-level cause carried by [`LoaderError::Io`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, LoaderError>;

// ---------------------------------------------------------------------------
// LoaderError – every failure surfaced by the load/save layer
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoaderError {
    /// The path (file or directory) does not exist.
    #[error("File not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// Required columns are absent, in the order the caller asked for them.
    #[error("Missing columns: {missing:?}")]
    SchemaMismatch { missing: Vec<String> },

    /// A CSV source had no header, no bytes, or content the parser rejected.
    #[error("Empty or invalid CSV file: {}: {reason}", .path.display())]
    EmptyOrInvalid { path: PathBuf, reason: String },

    /// The extension is not one of `.csv`, `.json`, `.xlsx`, `.xls`.
    #[error("Unsupported file extension: {extension}")]
    UnsupportedFormat { extension: String },

    /// Catch-all for reader/writer faults, wrapping the underlying cause.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: BoxError,
    },

    /// A batch load failed on the named dataset.
    #[error("Failed to load dataset '{name}': {source}")]
    Dataset {
        name: String,
        #[source]
        source: Box<LoaderError>,
    },
}

impl LoaderError {
    pub fn io(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        LoaderError::Io {
            context: context.into(),
            source: source.into(),
        }
    }

    /// The error underneath any [`LoaderError::Dataset`] wrappers.
    pub fn root_cause(&self) -> &LoaderError {
        match self {
            LoaderError::Dataset { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Name of the dataset a batch load failed on, if any.
    pub fn dataset_name(&self) -> Option<&str> {
        match self {
            LoaderError::Dataset { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Run `op`, logging any failure under `context` before handing it back.
///
/// Readers and writers route every engine call through here so a failure is
/// always both logged and returned.
pub(crate) fn attempt<T>(context: impl fmt::Display, op: impl FnOnce() -> Result<T>) -> Result<T> {
    op().inspect_err(|e| log::error!("{context}: {e}"))
}
