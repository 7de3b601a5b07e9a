//! Bounded TTL cache with insertion-order eviction
//!
//! Keys are kept in an explicit queue alongside the lookup table, so the
//! oldest insertion is always the one evicted when the cache is full.

use std::collections::VecDeque;
use std::hash::Hash;
use std::time::{Duration, Instant};

use ahash::AHashMap;

use crate::core::types::PlayerId;
use crate::game::TurnPhase;

/// Identity of a cached decision
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecisionKey {
    pub opponent: PlayerId,
    pub game_id: String,
    pub turn: u32,
    pub phase: TurnPhase,
    /// Serialized decision context
    pub context: String,
}

/// Identity of a cached situation analysis
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnalysisKey {
    pub game_id: String,
    pub turn: u32,
    pub phase: TurnPhase,
    pub opponent: PlayerId,
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    uses: u32,
}

#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: AHashMap<K, CacheEntry<V>>,
    order: VecDeque<K>,
    ttl: Duration,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl<K: Clone + Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: AHashMap::new(),
            order: VecDeque::new(),
            ttl,
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    /// Fresh value for `key`; expired entries are dropped and count as misses
    pub fn get(&mut self, key: &K, now: Instant) -> Option<V> {
        let expired = match self.entries.get_mut(key) {
            Some(entry) if now.saturating_duration_since(entry.inserted_at) <= self.ttl => {
                entry.uses += 1;
                self.hits += 1;
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.remove(key);
        }
        self.misses += 1;
        None
    }

    pub fn insert(&mut self, key: K, value: V, now: Instant) {
        if self.entries.contains_key(&key) {
            self.order.retain(|k| k != &key);
        }
        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                uses: 0,
            },
        );

        while self.entries.len() > self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let entry = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(entry.value)
    }

    /// Drop expired entries, returning how many were removed
    pub fn sweep(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.inserted_at) <= ttl);
        let entries = &self.entries;
        self.order.retain(|k| entries.contains_key(k));
        before - self.entries.len()
    }

    /// Keep only entries whose key satisfies `keep`
    pub fn retain_keys(&mut self, mut keep: impl FnMut(&K) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| keep(k));
        let entries = &self.entries;
        self.order.retain(|k| entries.contains_key(k));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// How often `key` was served from the cache
    pub fn uses(&self, key: &K) -> Option<u32> {
        self.entries.get(key).map(|e| e.uses)
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize) -> TtlCache<u32, &'static str> {
        TtlCache::new(Duration::from_secs(10), capacity)
    }

    #[test]
    fn test_hit_within_ttl() {
        let mut cache = cache(4);
        let now = Instant::now();
        cache.insert(1, "a", now);
        assert_eq!(cache.get(&1, now + Duration::from_secs(5)), Some("a"));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.uses(&1), Some(1));
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let mut cache = cache(4);
        let now = Instant::now();
        cache.insert(1, "a", now);
        assert_eq!(cache.get(&1, now + Duration::from_secs(11)), None);
        assert_eq!(cache.misses(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_oldest_insertion_evicted() {
        let mut cache = cache(3);
        let now = Instant::now();
        for key in 0..5 {
            cache.insert(key, "v", now);
        }
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&0));
        assert!(!cache.contains(&1));
        assert!(cache.contains(&4));
    }

    #[test]
    fn test_reinsert_moves_to_back() {
        let mut cache = cache(2);
        let now = Instant::now();
        cache.insert(1, "a", now);
        cache.insert(2, "b", now);
        cache.insert(1, "a2", now);
        cache.insert(3, "c", now);
        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
    }

    #[test]
    fn test_sweep_and_retain() {
        let mut cache = cache(8);
        let now = Instant::now();
        cache.insert(1, "old", now);
        cache.insert(2, "new", now + Duration::from_secs(8));
        assert_eq!(cache.sweep(now + Duration::from_secs(12)), 1);
        assert!(cache.contains(&2));

        cache.insert(3, "x", now + Duration::from_secs(8));
        assert_eq!(cache.retain_keys(|k| *k != 3), 1);
        assert_eq!(cache.len(), 1);
    }
}
