// crates/stats/src/cache.rs
//! Short-lived memo of the last reconciliation pass.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::time::Instant;
use tracing::debug;

use crate::reconcile::StatsDelta;

pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// What a cached delta was computed for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub cutoff: Option<NaiveDate>,
    pub root_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub ttl: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}

impl TtlPolicy {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn is_fresh(&self, computed_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(computed_at) < self.ttl
    }
}

/// Storage for reconciliation results.
///
/// Two callers may miss at the same time and both compute. The later `set`
/// wins; both results are equally valid.
pub trait DeltaCache: Send + Sync {
    fn get(&self, key: &CacheKey, now: Instant) -> Option<Arc<StatsDelta>>;
    fn set(&self, key: CacheKey, delta: Arc<StatsDelta>, computed_at: Instant);
}

struct Entry {
    key: CacheKey,
    delta: Arc<StatsDelta>,
    computed_at: Instant,
}

/// Holds at most one entry. Storing any key replaces whatever was there.
pub struct SingleSlotCache {
    policy: TtlPolicy,
    slot: Mutex<Option<Entry>>,
}

impl SingleSlotCache {
    pub fn new(policy: TtlPolicy) -> Self {
        Self {
            policy,
            slot: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> TtlPolicy {
        self.policy
    }
}

impl Default for SingleSlotCache {
    fn default() -> Self {
        Self::new(TtlPolicy::default())
    }
}

impl DeltaCache for SingleSlotCache {
    fn get(&self, key: &CacheKey, now: Instant) -> Option<Arc<StatsDelta>> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            Some(entry) if entry.key == *key && self.policy.is_fresh(entry.computed_at, now) => {
                debug!("Stats delta cache hit for {:?}", key);
                Some(Arc::clone(&entry.delta))
            }
            Some(entry) if entry.key == *key => {
                debug!("Stats delta cache expired for {:?}", key);
                None
            }
            _ => {
                debug!("Stats delta cache miss for {:?}", key);
                None
            }
        }
    }

    fn set(&self, key: CacheKey, delta: Arc<StatsDelta>, computed_at: Instant) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Entry {
            key,
            delta,
            computed_at,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(cutoff: Option<(i32, u32, u32)>, root: &str) -> CacheKey {
        CacheKey {
            cutoff: cutoff.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            root_id: root.to_string(),
        }
    }

    fn delta(messages: u64) -> Arc<StatsDelta> {
        let mut d = StatsDelta::default();
        d.aggregate.total_messages = messages;
        Arc::new(d)
    }

    #[test]
    fn test_ttl_is_strict() {
        let policy = TtlPolicy::new(Duration::from_secs(30));
        let t0 = Instant::now();
        assert!(policy.is_fresh(t0, t0));
        assert!(policy.is_fresh(t0, t0 + Duration::from_millis(29_999)));
        assert!(!policy.is_fresh(t0, t0 + Duration::from_secs(30)));
        // A clock reading earlier than computed_at counts as fresh.
        assert!(policy.is_fresh(t0 + Duration::from_secs(1), t0));
    }

    #[test]
    fn test_hit_within_ttl_returns_same_arc() {
        let cache = SingleSlotCache::default();
        let t0 = Instant::now();
        let stored = delta(5);
        cache.set(key(Some((2024, 1, 10)), "live"), Arc::clone(&stored), t0);

        let got = cache
            .get(&key(Some((2024, 1, 10)), "live"), t0 + Duration::from_secs(10))
            .unwrap();
        assert!(Arc::ptr_eq(&got, &stored));
    }

    #[test]
    fn test_expired_entry_misses() {
        let cache = SingleSlotCache::new(TtlPolicy::new(Duration::from_secs(5)));
        let t0 = Instant::now();
        cache.set(key(None, "live"), delta(1), t0);
        assert!(cache.get(&key(None, "live"), t0 + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn test_key_change_misses_and_new_key_evicts() {
        let cache = SingleSlotCache::default();
        let t0 = Instant::now();
        cache.set(key(Some((2024, 1, 10)), "live"), delta(1), t0);

        assert!(cache.get(&key(Some((2024, 1, 11)), "live"), t0).is_none());
        assert!(cache.get(&key(Some((2024, 1, 10)), "imported"), t0).is_none());

        cache.set(key(Some((2024, 1, 10)), "imported"), delta(2), t0);
        assert!(cache.get(&key(Some((2024, 1, 10)), "live"), t0).is_none());
        assert_eq!(
            cache
                .get(&key(Some((2024, 1, 10)), "imported"), t0)
                .unwrap()
                .aggregate
                .total_messages,
            2
        );
    }
}
