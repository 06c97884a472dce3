//! TTL caches for provider responses.

use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub trait CacheEntry {
    fn fetched_at(&self) -> Instant;
}

/// A cached value with its fetch time.
#[derive(Debug, Clone)]
pub struct Timed<V> {
    pub fetched_at: Instant,
    pub value: V,
}

impl<V> Timed<V> {
    pub fn now(value: V) -> Self {
        Self {
            fetched_at: Instant::now(),
            value,
        }
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() <= ttl
    }
}

impl<V> CacheEntry for Timed<V> {
    fn fetched_at(&self) -> Instant {
        self.fetched_at
    }
}

/// Drop expired entries, then the oldest ones until at most `max_entries` remain.
pub fn prune_cache<K, V>(cache: &DashMap<K, V>, max_entries: usize, max_age: Duration)
where
    K: Clone + Eq + Hash,
    V: CacheEntry,
{
    let now = Instant::now();
    let mut entries: Vec<(K, Instant)> = cache
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().fetched_at()))
        .collect();

    entries.retain(|(key, fetched_at)| {
        if now.duration_since(*fetched_at) > max_age {
            cache.remove(key);
            false
        } else {
            true
        }
    });

    if cache.len() <= max_entries {
        return;
    }

    entries.sort_by_key(|(_, fetched_at)| *fetched_at);
    for (key, _) in entries {
        if cache.len() <= max_entries {
            break;
        }
        cache.remove(&key);
    }
}

/// Cache key for a coordinate rounded to `decimals` places.
pub fn point_key(prefix: &str, lat: f64, lon: f64, decimals: usize) -> String {
    format!("{prefix}:{lat:.decimals$}:{lon:.decimals$}")
}
