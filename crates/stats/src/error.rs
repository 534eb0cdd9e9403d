// crates/stats/src/error.rs
use std::path::PathBuf;

use cc_dashboard_core::DiscoveryError;
use thiserror::Error;

/// Failure to load the precomputed stats snapshot.
///
/// A missing snapshot is not an error; see
/// [`read_snapshot`](crate::snapshot::read_snapshot).
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error reading stats snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed stats snapshot {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

pub type StatsResult<T> = Result<T, StatsError>;
