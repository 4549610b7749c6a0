use std::time::{Duration, SystemTime};

use hashlink::LinkedHashMap;
use serde::Serialize;

/// Counters exposed by `GET /stats`. Serialized as-is.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoreStats {
    pub total_keys: usize,
    pub total_ops: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub ttl_expirations: u64,
    pub uptime_seconds: u64,
    pub wal_file_size: u64,
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<SystemTime>,
}

/// Bounded in-memory key-value map with LRU eviction and lazy TTL expiry.
///
/// Recency order lives in the map itself: front is the eviction candidate,
/// back is most recently used. Expired entries linger (and keep counting
/// toward `total_keys`) until a read touches them or the sweeper runs.
pub struct MemoryStore {
    capacity: usize,
    entries: LinkedHashMap<String, Entry>,
    total_ops: u64,
    cache_hits: u64,
    cache_misses: u64,
    evictions: u64,
    ttl_expirations: u64,
    started_at: SystemTime,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: LinkedHashMap::new(),
            total_ops: 0,
            cache_hits: 0,
            cache_misses: 0,
            evictions: 0,
            ttl_expirations: 0,
            started_at: SystemTime::now(),
        }
    }

    /// Inserts or overwrites a key at the most-recent position. Overwrites
    /// never evict; only net growth beyond capacity does.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>, ttl: Option<u64>) {
        self.total_ops += 1;
        let key = key.into();
        let entry = Entry {
            value: value.into(),
            expires_at: expiry_from_ttl(ttl),
        };

        self.entries.remove(&key);
        if self.entries.len() >= self.capacity && self.entries.pop_front().is_some() {
            self.evictions += 1;
        }
        self.entries.insert(key, entry);
    }

    /// Reads a key and promotes it to most recently used. An expired entry is
    /// dropped on touch and reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<String> {
        self.total_ops += 1;

        let Some(entry) = self.entries.remove(key) else {
            self.cache_misses += 1;
            return None;
        };

        if is_expired(&entry, SystemTime::now()) {
            self.ttl_expirations += 1;
            self.cache_misses += 1;
            return None;
        }

        let value = entry.value.clone();
        self.entries.insert(key.to_string(), entry);
        self.cache_hits += 1;
        Some(value)
    }

    /// Returns whether the key was present. Removing an expired-but-unswept
    /// key still counts as success.
    pub fn delete(&mut self, key: &str) -> bool {
        self.total_ops += 1;
        self.entries.remove(key).is_some()
    }

    /// Non-promoting read; touches no counters and no recency order.
    pub fn peek(&self, key: &str) -> Option<&str> {
        let entry = self.entries.get(key)?;
        if is_expired(entry, SystemTime::now()) {
            return None;
        }
        Some(&entry.value)
    }

    /// Whole seconds until expiry, floored at zero. `None` for absent keys
    /// and for keys stored without a TTL.
    pub fn ttl_remaining(&self, key: &str) -> Option<u64> {
        let expires_at = self.entries.get(key)?.expires_at?;
        Some(
            expires_at
                .duration_since(SystemTime::now())
                .map(|left| left.as_secs())
                .unwrap_or(0),
        )
    }

    /// Keys in recency order, oldest first. Expired-but-unswept keys are
    /// included, matching what `total_keys` counts.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn sweep_expired(&mut self) -> usize {
        let now = SystemTime::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
        }
        self.ttl_expirations += expired.len() as u64;
        expired.len()
    }

    pub fn stats(&self, wal_file_size: u64) -> StoreStats {
        StoreStats {
            total_keys: self.entries.len(),
            total_ops: self.total_ops,
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
            evictions: self.evictions,
            ttl_expirations: self.ttl_expirations,
            uptime_seconds: self
                .started_at
                .elapsed()
                .map(|up| up.as_secs())
                .unwrap_or(0),
            wal_file_size,
        }
    }
}

fn expiry_from_ttl(ttl: Option<u64>) -> Option<SystemTime> {
    ttl.and_then(|secs| SystemTime::now().checked_add(Duration::from_secs(secs)))
}

fn is_expired(entry: &Entry, now: SystemTime) -> bool {
    entry.expires_at.is_some_and(|expires_at| expires_at <= now)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
