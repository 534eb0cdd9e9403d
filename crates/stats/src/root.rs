// crates/stats/src/root.rs
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cc_dashboard_core::Corpus;

use crate::snapshot::SNAPSHOT_FILE;

/// A Claude data directory (`~/.claude` or an imported copy of one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRoot {
    /// Stable identifier, part of the reconciliation cache key.
    pub id: String,
    pub claude_dir: PathBuf,
}

impl DataRoot {
    pub fn new(id: impl Into<String>, claude_dir: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            claude_dir: claude_dir.into(),
        }
    }

    pub fn claude_dir(&self) -> &Path {
        &self.claude_dir
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.claude_dir.join("projects")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.claude_dir.join(SNAPSHOT_FILE)
    }

    pub fn corpus(&self) -> Corpus {
        Corpus::new(self.projects_dir())
    }
}

/// Decides which data root requests are served from.
///
/// Called once per request, so implementations may consult the filesystem.
#[async_trait]
pub trait RootResolver: Send + Sync {
    async fn active_root(&self) -> DataRoot;
}

/// A fixed root.
#[async_trait]
impl RootResolver for DataRoot {
    async fn active_root(&self) -> DataRoot {
        self.clone()
    }
}
