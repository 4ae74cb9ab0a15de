// Error taxonomy for the library
// Malformed values never reach this type: they coerce to None/Invalid.
// Rows missing required fields are dropped, not reported.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightsError {
    /// The dataset could not be opened or read at all.
    #[error("Dataset unavailable at {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was readable but is not a usable delimited file.
    #[error("Malformed dataset {}: {source}", .path.display())]
    MalformedSource {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Dataset loader thread panicked while reading {0}")]
    LoaderPanicked(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InsightsError>;

impl InsightsError {
    /// Wrap a csv error, keeping I/O failures distinct from format failures.
    pub(crate) fn from_csv(path: impl Into<PathBuf>, err: csv::Error) -> Self {
        let path = path.into();
        if !err.is_io_error() {
            return InsightsError::MalformedSource { path, source: err };
        }

        let source = match err.into_kind() {
            csv::ErrorKind::Io(source) => source,
            kind => std::io::Error::new(std::io::ErrorKind::Other, format!("{:?}", kind)),
        };
        InsightsError::SourceUnavailable { path, source }
    }

    /// Replace the placeholder path used while reading from a bare reader.
    pub(crate) fn with_path(self, path: &std::path::Path) -> Self {
        match self {
            InsightsError::SourceUnavailable { source, .. } => InsightsError::SourceUnavailable {
                path: path.to_path_buf(),
                source,
            },
            InsightsError::MalformedSource { source, .. } => InsightsError::MalformedSource {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        }
    }
}
