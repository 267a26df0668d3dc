//! In-process counter cache with per-entry expiry.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use domains::CounterCache;

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: i64,
    expires_at: Instant,
}

/// `CounterCache` over a `DashMap`. Expired entries are dropped lazily on read.
#[derive(Debug, Default)]
pub struct TtlCounterCache {
    entries: DashMap<String, Entry>,
}

impl TtlCounterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CounterCache for TtlCounterCache {
    fn get(&self, key: &str) -> Option<i64> {
        let now = Instant::now();
        let hit = self.entries.get(key).map(|e| *e)?;
        if hit.expires_at > now {
            return Some(hit.value);
        }
        self.entries.remove_if(key, |_, e| e.expires_at <= now);
        None
    }

    fn set(&self, key: &str, value: i64, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_value_until_expiry() {
        let cache = TtlCounterCache::new();
        cache.set("cards_count", 7, Duration::from_secs(30));
        assert_eq!(cache.get("cards_count"), Some(7));
        assert_eq!(cache.get("users_count"), None);
    }

    #[test]
    fn expired_entries_are_evicted() {
        let cache = TtlCounterCache::new();
        cache.set("cards_count", 7, Duration::ZERO);
        assert_eq!(cache.get("cards_count"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_and_overwrite() {
        let cache = TtlCounterCache::new();
        cache.set("k", 1, Duration::from_secs(30));
        cache.set("k", 2, Duration::from_secs(30));
        assert_eq!(cache.get("k"), Some(2));
        cache.invalidate("k");
        assert_eq!(cache.get("k"), None);
    }
}
