// crates/server/src/data_source.rs
//! Live vs imported data root selection.
//!
//! Imported data lives under `<import-dir>/claude-data` with a `meta.json`
//! beside it. The imported root is active while the flag file
//! `<import-dir>/.use-imported` exists and `meta.json` is present.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cc_dashboard_stats::{DataRoot, RootResolver};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

const FLAG_FILE: &str = ".use-imported";
const META_FILE: &str = "meta.json";
const IMPORTED_CLAUDE_DIR: &str = "claude-data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Live,
    Imported,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Live => "live",
            SourceKind::Imported => "imported",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "live" => Some(SourceKind::Live),
            "imported" => Some(SourceKind::Imported),
            _ => None,
        }
    }
}

/// Contents of `meta.json`, written when an export archive is imported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportMeta {
    pub imported_at: String,
    pub exported_at: String,
    pub exported_from: String,
    pub project_count: u64,
    pub session_count: u64,
}

#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("No imported data available")]
    NoImportedData,

    #[error("IO error updating data source flag {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct DataSource {
    live_dir: PathBuf,
    import_dir: PathBuf,
}

impl DataSource {
    pub fn new(live_dir: impl Into<PathBuf>, import_dir: impl Into<PathBuf>) -> Self {
        Self {
            live_dir: live_dir.into(),
            import_dir: import_dir.into(),
        }
    }

    pub fn live_dir(&self) -> &Path {
        &self.live_dir
    }

    pub fn import_dir(&self) -> &Path {
        &self.import_dir
    }

    fn flag_path(&self) -> PathBuf {
        self.import_dir.join(FLAG_FILE)
    }

    fn meta_path(&self) -> PathBuf {
        self.import_dir.join(META_FILE)
    }

    pub async fn has_imported_data(&self) -> bool {
        fs::metadata(self.meta_path())
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    pub async fn active(&self) -> SourceKind {
        let flagged = fs::try_exists(self.flag_path()).await.unwrap_or(false);
        if flagged && self.has_imported_data().await {
            SourceKind::Imported
        } else {
            SourceKind::Live
        }
    }

    /// Parsed `meta.json`, or `None` if absent or unreadable.
    pub async fn import_meta(&self) -> Option<ImportMeta> {
        let path = self.meta_path();
        let raw = fs::read_to_string(&path).await.ok()?;
        match serde_json::from_str(&raw) {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!("Ignoring unreadable import metadata {:?}: {}", path, e);
                None
            }
        }
    }

    /// Switch the active source by creating or removing the flag file.
    pub async fn set_active(&self, kind: SourceKind) -> Result<(), DataSourceError> {
        let flag = self.flag_path();
        let io_err = |source: std::io::Error| DataSourceError::Io {
            path: flag.clone(),
            source,
        };
        match kind {
            SourceKind::Imported => {
                if !self.has_imported_data().await {
                    return Err(DataSourceError::NoImportedData);
                }
                fs::create_dir_all(&self.import_dir).await.map_err(io_err)?;
                fs::write(&flag, "1").await.map_err(io_err)?;
            }
            SourceKind::Live => match fs::remove_file(&flag).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_err(e)),
            },
        }
        info!("Data source switched to {}", kind.as_str());
        Ok(())
    }
}

#[async_trait]
impl RootResolver for DataSource {
    async fn active_root(&self) -> DataRoot {
        match self.active().await {
            SourceKind::Live => DataRoot::new(SourceKind::Live.as_str(), &self.live_dir),
            SourceKind::Imported => DataRoot::new(
                SourceKind::Imported.as_str(),
                self.import_dir.join(IMPORTED_CLAUDE_DIR),
            ),
        }
    }
}
