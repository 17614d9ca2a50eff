use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Last known-good rate together with the instant it was fetched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedRate {
    pub value: f64,
    pub fetched_at: Instant,
}

/// Single-slot holder for the last validated rate. Only ever replaced
/// whole, after validation; an empty slot is an explicit state distinct
/// from any numeric value, including zero.
#[derive(Debug, Default)]
pub struct RateCache {
    slot: Option<CachedRate>,
}

impl RateCache {
    pub fn new() -> Self {
        Self { slot: None }
    }

    pub fn get(&self) -> Option<CachedRate> {
        self.slot
    }

    /// Cached value regardless of age, for degraded cycles.
    pub fn value(&self) -> Option<f64> {
        self.slot.map(|c| c.value)
    }

    pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        match self.slot {
            Some(cached) => now.duration_since(cached.fetched_at) < ttl,
            None => false,
        }
    }

    pub fn fresh_value(&self, ttl: Duration, now: Instant) -> Option<f64> {
        if self.is_fresh(ttl, now) {
            debug!("Cache HIT");
            self.slot.map(|c| c.value)
        } else {
            debug!("Cache MISS");
            None
        }
    }

    pub fn set(&mut self, value: f64, now: Instant) {
        debug!(value, "Cache PUT");
        self.slot = Some(CachedRate {
            value,
            fetched_at: now,
        });
    }

    pub fn invalidate(&mut self) {
        debug!("Cache INVALIDATE");
        self.slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_cache_set_get_invalidate() {
        let mut cache = RateCache::new();
        assert!(cache.get().is_none());
        assert!(cache.value().is_none());

        let now = Instant::now();
        cache.set(7123.0, now);
        assert_eq!(cache.get().unwrap().value, 7123.0);
        assert_eq!(cache.value(), Some(7123.0));

        cache.invalidate();
        assert!(cache.get().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_freshness_window() {
        let ttl = Duration::from_secs(3600);
        let mut cache = RateCache::new();

        // Empty cache is never fresh
        assert!(!cache.is_fresh(ttl, Instant::now()));

        let t0 = Instant::now();
        cache.set(7123.0, t0);
        assert!(cache.is_fresh(ttl, t0));

        tokio::time::advance(Duration::from_secs(1800)).await;
        assert!(cache.is_fresh(ttl, Instant::now()));
        assert_eq!(cache.fresh_value(ttl, Instant::now()), Some(7123.0));

        tokio::time::advance(Duration::from_secs(1800)).await;
        assert!(!cache.is_fresh(ttl, Instant::now()));
        assert_eq!(cache.fresh_value(ttl, Instant::now()), None);
        // Stale value is still reachable for degraded cycles
        assert_eq!(cache.value(), Some(7123.0));
    }
}
