use std::path::{Path, PathBuf};

/// The errors that may occur while turning statement exports into a report.
///
/// Configuration problems are fatal before any transaction is processed.
/// Record problems are strict: the first malformed record aborts the run
/// rather than being skipped.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration file is missing or does not have the expected shape.
    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// A statement row could not be normalized into a transaction.
    #[error("malformed record at {location}: {message}")]
    MalformedRecord { location: String, message: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config(path: &Path, message: impl Into<String>) -> Self {
        Error::Config {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn malformed(location: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MalformedRecord {
            location: location.into(),
            message: message.into(),
        }
    }
}
