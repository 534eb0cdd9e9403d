// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading a JSONL session file as a whole.
///
/// Individual bad lines never produce one of these; they are skipped by the
/// reader and reported through [`EventError`] at debug level.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Session file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied reading file: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

/// A single log line that could not be decoded into an [`Event`](crate::Event).
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unrecognised line shape: {0}")]
    UnknownShape(String),
}

/// Errors that can occur while locating files in the corpus.
///
/// Missing or unreadable directories are not errors: the scanner treats them
/// as empty.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Invalid identifier: {0:?}")]
    InvalidId(String),
}
