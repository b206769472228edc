use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct Slot<V> {
    value: V,
    inserted_at: Instant,
    last_used: u64,
}

/// Size-bounded memo table. Entries expire `ttl` after insertion; when full,
/// the least recently used entry is evicted.
pub struct BoundedCache<K, V> {
    slots: HashMap<K, Slot<V>>,
    capacity: usize,
    ttl: Duration,
    clock: u64,
}

impl<K: Eq + Hash + Clone, V: Clone> BoundedCache<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            slots: HashMap::with_capacity(capacity),
            capacity,
            ttl,
            clock: 0,
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Instant::now())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn get_at(&mut self, key: &K, now: Instant) -> Option<V> {
        let expired = match self.slots.get(key) {
            Some(slot) => now.duration_since(slot.inserted_at) >= self.ttl,
            None => return None,
        };
        if expired {
            self.slots.remove(key);
            return None;
        }

        self.clock += 1;
        let clock = self.clock;
        self.slots.get_mut(key).map(|slot| {
            slot.last_used = clock;
            slot.value.clone()
        })
    }

    fn insert_at(&mut self, key: K, value: V, now: Instant) {
        if self.capacity == 0 {
            return;
        }

        if !self.slots.contains_key(&key) && self.slots.len() >= self.capacity {
            self.purge_expired(now);
        }
        if !self.slots.contains_key(&key) && self.slots.len() >= self.capacity {
            self.evict_lru();
        }

        self.clock += 1;
        self.slots.insert(
            key,
            Slot {
                value,
                inserted_at: now,
                last_used: self.clock,
            },
        );
    }

    fn purge_expired(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.slots
            .retain(|_, slot| now.duration_since(slot.inserted_at) < ttl);
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .slots
            .iter()
            .min_by_key(|(_, slot)| slot.last_used)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.slots.remove(&key);
        }
    }
}
