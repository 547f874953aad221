// src/storage/memory.rs
use dashmap::DashMap;
use std::time::{Duration, Instant};
use crate::models::status::ServerStatus;

#[derive(Debug, Clone)]
struct CachedStatus {
    status: ServerStatus,
    resolved_at: Instant,
}

/// Recently resolved statuses keyed by `host:port`, so frequent polling does
/// not open a socket per request. A zero TTL disables caching.
pub struct StatusCache {
    entries: DashMap<String, CachedStatus>,
    ttl: Duration,
}

impl StatusCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn key(host: &str, port: u16) -> String {
        format!("{}:{}", host.to_ascii_lowercase(), port)
    }

    pub fn get_fresh(&self, key: &str) -> Option<ServerStatus> {
        if self.ttl.is_zero() {
            return None;
        }
        self.entries
            .get(key)
            .filter(|entry| entry.resolved_at.elapsed() < self.ttl)
            .map(|entry| entry.status.clone())
    }

    pub fn insert(&self, key: String, status: ServerStatus) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries.insert(
            key,
            CachedStatus {
                status,
                resolved_at: Instant::now(),
            },
        );
    }

    pub fn cleanup_stale(&self) {
        self.entries.retain(|_, entry| entry.resolved_at.elapsed() < self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entries_are_served() {
        let cache = StatusCache::new(Duration::from_secs(60));
        let key = StatusCache::key("Play.Example.org", 25565);
        assert_eq!(key, "play.example.org:25565");

        cache.insert(key.clone(), ServerStatus::offline());
        assert_eq!(cache.get_fresh(&key), Some(ServerStatus::offline()));
        assert_eq!(cache.get_fresh("other:25565"), None);
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let cache = StatusCache::new(Duration::ZERO);
        cache.insert("a:1".into(), ServerStatus::offline());
        assert!(cache.is_empty());
        assert_eq!(cache.get_fresh("a:1"), None);
    }

    #[test]
    fn stale_entries_are_dropped() {
        let cache = StatusCache::new(Duration::from_millis(20));
        cache.insert("a:1".into(), ServerStatus::offline());
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get_fresh("a:1"), None);
        cache.cleanup_stale();
        assert_eq!(cache.len(), 0);
    }
}
