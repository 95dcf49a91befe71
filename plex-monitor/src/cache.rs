//! Short-lived cache of fetched values

use std::hash::Hash;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

/// Values expire `ttl` after insertion
///
/// Expired entries are evicted when read and swept on every insert, so keys
/// that are never read again do not accumulate.
#[derive(Debug)]
pub struct TtlCache<K, V>
where
    K: Eq + Hash,
{
    ttl: Duration,
    entries: DashMap<K, (Instant, V)>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let fresh = {
            let entry = self.entries.get(key)?;
            let (inserted, value) = entry.value();
            (inserted.elapsed() < self.ttl).then(|| value.clone())
        };

        if fresh.is_none() {
            self.entries.remove(key);
        }
        fresh
    }

    /// A zero TTL disables caching
    pub fn insert(&self, key: K, value: V) {
        if self.ttl.is_zero() {
            return;
        }
        let ttl = self.ttl;
        self.entries
            .retain(|_, (inserted, _)| inserted.elapsed() < ttl);
        self.entries.insert(key, (Instant::now(), value));
    }

    pub fn remove(&self, key: &K) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
