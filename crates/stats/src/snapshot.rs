// crates/stats/src/snapshot.rs
//! Stats snapshot reader.
//!
//! The snapshot (`stats-cache.json`) is a periodic rollup written by Claude
//! Code itself. It covers every day up to and including `lastComputedDate`.
//! Unlike session logs it is one structured document, so a snapshot that
//! exists but can't be decoded is a hard error.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::SnapshotError;

pub const SNAPSHOT_FILE: &str = "stats-cache.json";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub message_count: u64,
    pub session_count: u64,
    pub tool_call_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyModelTokens {
    pub date: NaiveDate,
    pub tokens_by_model: BTreeMap<String, u64>,
}

/// Cumulative per-model figures as stored in the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_input_tokens: u64,
    pub cache_creation_input_tokens: u64,
    /// Cost recorded when the snapshot was written. Never summed; costs are
    /// recomputed from token totals.
    #[serde(rename = "costUSD")]
    pub cost_usd: f64,
    pub context_window: u64,
    pub max_output_tokens: u64,
    pub web_search_requests: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LongestSession {
    pub session_id: String,
    pub duration: u64,
    pub message_count: u64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsSnapshot {
    pub version: u64,
    /// Inclusive cutoff day, `YYYY-MM-DD`. Empty when nothing was computed.
    pub last_computed_date: String,
    pub daily_activity: Vec<DailyActivity>,
    pub daily_model_tokens: Vec<DailyModelTokens>,
    pub model_usage: BTreeMap<String, ModelUsage>,
    pub total_sessions: u64,
    pub total_messages: u64,
    pub longest_session: LongestSession,
    pub first_session_date: String,
    #[serde(deserialize_with = "hour_keys")]
    pub hour_counts: BTreeMap<u8, u64>,
    pub total_speculation_time_saved_ms: u64,
}

/// Hour keys arrive as strings, either "9" or "09".
fn hour_keys<'de, D>(deserializer: D) -> Result<BTreeMap<u8, u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, u64>>::deserialize(deserializer)?.unwrap_or_default();
    let mut hours = BTreeMap::new();
    for (key, count) in raw {
        let hour = key
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|h| *h < 24)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid hour key {:?}", key)))?;
        *hours.entry(hour).or_insert(0) += count;
    }
    Ok(hours)
}

impl StatsSnapshot {
    /// The cutoff day, or `None` when the whole corpus must be reconciled.
    pub fn cutoff(&self) -> Option<NaiveDate> {
        let date = self.last_computed_date.trim();
        if date.is_empty() {
            return None;
        }
        NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
    }
}

/// Load the snapshot at `path`.
///
/// A missing file yields [`StatsSnapshot::default`] (no cutoff, all zeros).
///
/// # Errors
/// - `SnapshotError::Io` if the file exists but can't be read
/// - `SnapshotError::Malformed` if it isn't a valid snapshot document
pub async fn read_snapshot(path: &Path) -> Result<StatsSnapshot, SnapshotError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No stats snapshot at {:?}, starting from zero", path);
            return Ok(StatsSnapshot::default());
        }
        Err(e) => {
            return Err(SnapshotError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let snapshot: StatsSnapshot =
        serde_json::from_str(&raw).map_err(|e| SnapshotError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if !snapshot.last_computed_date.trim().is_empty() && snapshot.cutoff().is_none() {
        return Err(SnapshotError::Malformed {
            path: path.to_path_buf(),
            message: format!(
                "lastComputedDate {:?} is not a YYYY-MM-DD date",
                snapshot.last_computed_date
            ),
        });
    }

    Ok(snapshot)
}
