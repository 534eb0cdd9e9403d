// crates/stats/src/lib.rs
//! Dashboard statistics: the stats snapshot reconciled with live session logs.
pub mod cache;
pub mod error;
pub mod reconcile;
pub mod root;
pub mod service;
pub mod snapshot;

pub use cache::{CacheKey, DeltaCache, SingleSlotCache, TtlPolicy, DEFAULT_TTL};
pub use error::{SnapshotError, StatsError, StatsResult};
pub use reconcile::{compute_delta, Aggregate, DayCounts, StatsDelta};
pub use root::{DataRoot, RootResolver};
pub use service::{DashboardStats, ModelUsageSummary, StatsConfig, StatsService};
pub use snapshot::{read_snapshot, StatsSnapshot};
