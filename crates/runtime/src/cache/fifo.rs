//! Insertion-ordered bounded map.

use std::collections::{HashMap, VecDeque};

/// Bounded cache evicting strictly by insertion order.
///
/// Reads never affect eviction order, and inserting a key that is already
/// present is a no-op: the first value stays until it is evicted.
#[derive(Debug)]
pub struct FifoCache<V> {
    capacity: usize,
    entries: HashMap<String, V>,
    order: VecDeque<String>,
}

impl<V> FifoCache<V> {
    /// A cache holding at most `capacity` entries. Zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Insert `value` under `key`.
    ///
    /// Returns the key evicted to make room, if any.
    pub fn insert(&mut self, key: &str, value: V) -> Option<String> {
        if self.capacity == 0 || self.entries.contains_key(key) {
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.order.pop_front().inspect(|oldest| {
                self.entries.remove(oldest);
            })
        } else {
            None
        };

        self.entries.insert(key.to_string(), value);
        self.order.push_back(key.to_string());
        evicted
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let value = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(value)
    }

    /// Keys from oldest to newest.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
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

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
