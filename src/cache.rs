use std::time::Duration;

use chrono::Utc;

use crate::error::Result;
use crate::models::TipCollection;
use crate::storage::LocalStore;

pub const CACHED_TIPS_KEY: &str = "cachedTips";
pub const CACHE_TIMESTAMP_KEY: &str = "tipsCacheTimestamp";
pub const LIKED_TIPS_KEY: &str = "likedTips";

pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Single-entry tip snapshot with a wall-clock TTL.
pub struct TipCache<C: Clock = SystemClock> {
    store: LocalStore,
    ttl: Duration,
    clock: C,
}

impl TipCache<SystemClock> {
    pub fn new(store: LocalStore, ttl: Duration) -> Self {
        Self::with_clock(store, ttl, SystemClock)
    }
}

impl<C: Clock> TipCache<C> {
    pub fn with_clock(store: LocalStore, ttl: Duration, clock: C) -> Self {
        Self { store, ttl, clock }
    }

    /// Replaces the snapshot. Storage failures are logged, never returned.
    pub fn save(&self, tips: &TipCollection) {
        if let Err(e) = self.try_save(tips) {
            tracing::warn!("Failed to save tips to cache: {}", e);
        }
    }

    fn try_save(&self, tips: &TipCollection) -> Result<()> {
        self.store.set_many([
            (CACHED_TIPS_KEY, serde_json::to_string(tips)?),
            (CACHE_TIMESTAMP_KEY, self.clock.now_millis().to_string()),
        ])
    }

    /// The snapshot if it is younger than the TTL. Any failure reads as a miss.
    pub fn load(&self) -> Option<TipCollection> {
        match self.try_load() {
            Ok(tips) => tips,
            Err(e) => {
                tracing::warn!("Failed to load tips from cache: {}", e);
                None
            }
        }
    }

    fn try_load(&self) -> Result<Option<TipCollection>> {
        let (Some(payload), Some(timestamp)) = (
            self.store.get(CACHED_TIPS_KEY)?,
            self.store.get(CACHE_TIMESTAMP_KEY)?,
        ) else {
            return Ok(None);
        };

        let Ok(timestamp) = timestamp.trim().parse::<i64>() else {
            tracing::warn!("Ignoring unparsable cache timestamp '{}'", timestamp);
            return Ok(None);
        };

        let age = self.clock.now_millis() - timestamp;
        if age < 0 || age as u128 >= self.ttl.as_millis() {
            tracing::debug!("Tip cache expired ({} ms old)", age);
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&payload)?))
    }

    pub fn clear(&self) {
        for key in [CACHED_TIPS_KEY, CACHE_TIMESTAMP_KEY] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!("Failed to clear {}: {}", key, e);
            }
        }
    }
}

/// Ids of tips this installation has liked. Read once, written through.
pub struct LikedTips {
    store: LocalStore,
    ids: Vec<String>,
}

impl LikedTips {
    pub fn new(store: LocalStore) -> Self {
        let ids = match Self::read_ids(&store) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("Failed to load liked tips: {}", e);
                Vec::new()
            }
        };
        Self { store, ids }
    }

    fn read_ids(store: &LocalStore) -> Result<Vec<String>> {
        match store.get(LIKED_TIPS_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|liked| liked == id)
    }

    pub fn remember(&mut self, id: &str) {
        if self.contains(id) {
            return;
        }
        self.ids.push(id.to_string());

        let result = serde_json::to_string(&self.ids)
            .map_err(Into::into)
            .and_then(|raw| self.store.set(LIKED_TIPS_KEY, raw));
        if let Err(e) = result {
            tracing::warn!("Failed to remember liked tip {}: {}", id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::defaults::default_tips;
    use tempfile::{tempdir, TempDir};

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[derive(Clone, Default)]
    struct ManualClock(Rc<Cell<i64>>);

    impl ManualClock {
        fn advance(&self, by: Duration) {
            self.0.set(self.0.get() + by.as_millis() as i64);
        }
    }

    impl Clock for ManualClock {
        fn now_millis(&self) -> i64 {
            self.0.get()
        }
    }

    fn cache() -> (TempDir, LocalStore, ManualClock, TipCache<ManualClock>) {
        let dir = tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("store.json"));
        let clock = ManualClock::default();
        clock.advance(Duration::from_secs(1_700_000_000));
        let cache = TipCache::with_clock(store.clone(), DAY, clock.clone());
        (dir, store, clock, cache)
    }

    #[test]
    fn round_trip_within_ttl() {
        let (_dir, _store, clock, cache) = cache();
        let tips = default_tips();
        cache.save(&tips);

        clock.advance(DAY - Duration::from_millis(1));
        assert_eq!(cache.load(), Some(tips));
    }

    #[test]
    fn expires_after_ttl() {
        let (_dir, _store, clock, cache) = cache();
        cache.save(&default_tips());

        clock.advance(DAY);
        assert_eq!(cache.load(), None);
    }

    #[test]
    fn save_replaces_previous_snapshot() {
        let (_dir, _store, _clock, cache) = cache();
        cache.save(&default_tips());
        let empty = TipCollection::new();
        cache.save(&empty);
        assert_eq!(cache.load(), Some(empty));
    }

    #[test]
    fn corrupt_payload_reads_as_absent() {
        let (_dir, store, _clock, cache) = cache();
        cache.save(&default_tips());
        store.set(CACHED_TIPS_KEY, "{broken").unwrap();
        assert_eq!(cache.load(), None);
    }

    #[test]
    fn missing_timestamp_reads_as_absent() {
        let (_dir, store, _clock, cache) = cache();
        cache.save(&default_tips());
        store.remove(CACHE_TIMESTAMP_KEY).unwrap();
        assert_eq!(cache.load(), None);
    }

    #[test]
    fn clear_removes_snapshot() {
        let (_dir, store, _clock, cache) = cache();
        store.set(LIKED_TIPS_KEY, "[]").unwrap();
        cache.save(&default_tips());
        cache.clear();
        assert_eq!(cache.load(), None);
        assert_eq!(store.get(LIKED_TIPS_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn liked_tips_are_deduplicated() {
        let (_dir, store, _clock, _cache) = cache();
        let mut liked = LikedTips::new(store.clone());
        assert!(!liked.contains("w1"));

        liked.remember("w1");
        liked.remember("w1");
        liked.remember("s2");

        assert!(liked.contains("w1"));
        assert_eq!(
            store.get(LIKED_TIPS_KEY).unwrap().as_deref(),
            Some(r#"["w1","s2"]"#)
        );
    }

    #[test]
    fn liked_tips_are_read_once_and_written_through() {
        let (_dir, store, _clock, _cache) = cache();
        store.set(LIKED_TIPS_KEY, r#"["m1"]"#).unwrap();

        let mut liked = LikedTips::new(store.clone());
        std::fs::remove_file(store.path()).unwrap();
        assert!(liked.contains("m1"));

        liked.remember("e2");
        let reloaded = LikedTips::new(store.clone());
        assert!(reloaded.contains("m1"));
        assert!(reloaded.contains("e2"));
    }

    #[test]
    fn snapshot_and_timestamp_are_written_together() {
        let (_dir, store, clock, cache) = cache();
        cache.save(&default_tips());

        assert!(store.get(CACHED_TIPS_KEY).unwrap().is_some());
        assert_eq!(
            store.get(CACHE_TIMESTAMP_KEY).unwrap(),
            Some(clock.now_millis().to_string())
        );
    }
}
