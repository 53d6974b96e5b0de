//! Bounded response cache with optional TTL.
//!
//! The scoring client memoizes read-only calls so UI re-renders do not turn
//! into redundant network round-trips. The cache is explicitly bounded and
//! optionally time-limited; it is not a correctness mechanism and must not be
//! relied upon for consistency across model redeployments.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::time::{Duration, Instant};

struct CachedValue<V> {
    value: V,
    inserted: Instant,
}

/// FIFO-bounded cache keyed by request arguments.
pub struct BoundedCache<K, V> {
    capacity: usize,
    ttl: Option<Duration>,
    entries: HashMap<K, CachedValue<V>>,
    order: VecDeque<K>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Look up a cached value, evicting it first if its TTL has elapsed.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let expired = match (self.entries.get(key), self.ttl) {
            (Some(entry), Some(ttl)) => entry.inserted.elapsed() > ttl,
            (Some(_), None) => false,
            (None, _) => return None,
        };

        if expired {
            self.invalidate(key);
            return None;
        }

        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn insert(&mut self, key: K, value: V) {
        if self.entries.contains_key(&key) {
            self.order.retain(|k| k != &key);
        }
        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            CachedValue {
                value,
                inserted: Instant::now(),
            },
        );

        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    pub fn invalidate(&mut self, key: &K) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
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
}
