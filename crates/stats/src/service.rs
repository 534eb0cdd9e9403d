// crates/stats/src/service.rs
//! Read operations behind the dashboard.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use cc_dashboard_core::{PricingTable, ProjectInfo, SessionDetail, SessionInfo};
use chrono::NaiveDate;
use serde::Serialize;
use tokio::time::Instant;

use crate::cache::{CacheKey, DeltaCache, SingleSlotCache, TtlPolicy, DEFAULT_TTL};
use crate::error::StatsResult;
use crate::reconcile::{compute_delta, Aggregate, StatsDelta};
use crate::root::{DataRoot, RootResolver};
use crate::snapshot::{read_snapshot, DailyActivity, DailyModelTokens, LongestSession, ModelUsage};

pub const DEFAULT_RECENT_SESSIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsConfig {
    /// Length of the `recentSessions` list.
    pub recent_sessions: usize,
    pub cache_ttl: Duration,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            recent_sessions: DEFAULT_RECENT_SESSIONS,
            cache_ttl: DEFAULT_TTL,
        }
    }
}

/// Per-model figures with the cost recomputed from merged token totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUsageSummary {
    #[serde(flatten)]
    pub usage: ModelUsage,
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_sessions: u64,
    pub total_messages: u64,
    pub total_tokens: u64,
    pub estimated_cost: f64,
    pub daily_activity: Vec<DailyActivity>,
    pub daily_model_tokens: Vec<DailyModelTokens>,
    pub model_usage: BTreeMap<String, ModelUsageSummary>,
    /// UTC hour of day to activity count. Serialized with unpadded string
    /// keys (`"9"`, not `"09"`), the same form the snapshot uses; snapshot
    /// keys written either way are merged into one bucket.
    pub hour_counts: BTreeMap<u8, u64>,
    pub first_session_date: String,
    pub longest_session: LongestSession,
    pub project_count: usize,
    pub recent_sessions: Vec<SessionInfo>,
}

pub struct StatsService {
    resolver: Arc<dyn RootResolver>,
    pricing: Arc<PricingTable>,
    cache: Arc<dyn DeltaCache>,
    config: StatsConfig,
}

impl StatsService {
    pub fn new(resolver: Arc<dyn RootResolver>, config: StatsConfig) -> Self {
        let cache = Arc::new(SingleSlotCache::new(TtlPolicy::new(config.cache_ttl)));
        Self::with_parts(resolver, Arc::new(PricingTable::default()), cache, config)
    }

    pub fn with_parts(
        resolver: Arc<dyn RootResolver>,
        pricing: Arc<PricingTable>,
        cache: Arc<dyn DeltaCache>,
        config: StatsConfig,
    ) -> Self {
        Self {
            resolver,
            pricing,
            cache,
            config,
        }
    }

    pub async fn active_root(&self) -> DataRoot {
        self.resolver.active_root().await
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    /// Delta for `root` after `cutoff`, served from the cache while fresh.
    pub async fn delta(&self, root: &DataRoot, cutoff: Option<NaiveDate>) -> Arc<StatsDelta> {
        let key = CacheKey {
            cutoff,
            root_id: root.id.clone(),
        };
        if let Some(hit) = self.cache.get(&key, Instant::now()) {
            return hit;
        }

        let delta = Arc::new(compute_delta(&root.corpus(), cutoff, &self.pricing).await);
        self.cache.set(key, Arc::clone(&delta), Instant::now());
        delta
    }

    /// Snapshot merged with everything newer, plus project count and recent sessions.
    ///
    /// # Errors
    /// Fails only when the snapshot exists but can't be read or decoded.
    pub async fn dashboard_stats(&self) -> StatsResult<DashboardStats> {
        let root = self.active_root().await;
        let snapshot = read_snapshot(&root.snapshot_path()).await?;
        let delta = self.delta(&root, snapshot.cutoff()).await;

        let mut merged = Aggregate::from(&snapshot);
        merged.merge(&delta.aggregate);

        let mut total_tokens = 0;
        let mut estimated_cost = 0.0;
        let mut model_usage = BTreeMap::new();
        for (model, tokens) in &merged.model_usage {
            let cost = self.pricing.cost(model, tokens);
            total_tokens += tokens.total();
            estimated_cost += cost;

            let mut usage = snapshot.model_usage.get(model).cloned().unwrap_or_default();
            usage.input_tokens = tokens.input_tokens;
            usage.output_tokens = tokens.output_tokens;
            usage.cache_read_input_tokens = tokens.cache_read_tokens;
            usage.cache_creation_input_tokens = tokens.cache_write_tokens;
            model_usage.insert(
                model.clone(),
                ModelUsageSummary {
                    usage,
                    estimated_cost: cost,
                },
            );
        }

        let first_session_date = if snapshot.first_session_date.is_empty() {
            delta
                .aggregate
                .daily_activity
                .iter()
                .find(|(_, c)| c.session_count > 0)
                .map(|(date, _)| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        } else {
            snapshot.first_session_date.clone()
        };

        let corpus = root.corpus();
        let project_count = corpus
            .session_files()
            .await
            .into_iter()
            .map(|f| f.project_id)
            .collect::<BTreeSet<_>>()
            .len();
        let recent_sessions = corpus
            .sessions(self.config.recent_sessions, 0, &self.pricing)
            .await;

        Ok(DashboardStats {
            total_sessions: merged.total_sessions,
            total_messages: merged.total_messages,
            total_tokens,
            estimated_cost,
            daily_activity: merged.daily_activity_series(),
            daily_model_tokens: merged.daily_model_tokens_series(),
            model_usage,
            hour_counts: merged.hour_counts,
            first_session_date,
            longest_session: snapshot.longest_session,
            project_count,
            recent_sessions,
        })
    }

    pub async fn projects(&self) -> Vec<ProjectInfo> {
        let corpus = self.active_root().await.corpus();
        corpus.projects(&self.pricing).await
    }

    pub async fn sessions(&self, limit: usize, offset: usize) -> Vec<SessionInfo> {
        let corpus = self.active_root().await.corpus();
        corpus.sessions(limit, offset, &self.pricing).await
    }

    pub async fn project_sessions(&self, project_id: &str) -> StatsResult<Vec<SessionInfo>> {
        let corpus = self.active_root().await.corpus();
        Ok(corpus.project_sessions(project_id, &self.pricing).await?)
    }

    pub async fn search_sessions(&self, query: &str, limit: usize) -> Vec<SessionInfo> {
        let corpus = self.active_root().await.corpus();
        corpus.search(query, limit, &self.pricing).await
    }

    pub async fn session_detail(&self, session_id: &str) -> StatsResult<Option<SessionDetail>> {
        let corpus = self.active_root().await.corpus();
        Ok(corpus.session_detail(session_id, &self.pricing).await?)
    }
}
