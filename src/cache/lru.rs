//! Fixed-capacity LRU map with eviction disposal.
//!
//! Single-threaded by design: the cache is only touched from the handle
//! owner's synchronous callback context, so there is no internal locking.

use std::collections::VecDeque;
use std::hash::Hash;

use ahash::AHashMap;

/// Disposal callback invoked on an entry before it is evicted.
///
/// The signature is infallible on purpose: callers that destroy fallible
/// resources (component instances) wrap the failure handling themselves so
/// a broken handle cannot poison the cache.
pub type Disposer<K, V> = Box<dyn FnMut(&K, V)>;

/// A least-recently-used map with a capacity fixed at construction.
///
/// `get` counts as a use and promotes the entry to most-recently-used.
/// Inserting beyond capacity evicts exactly the least-recently-used entry,
/// running the disposer on it first.
pub struct LruCache<K, V> {
    capacity: usize,
    entries: AHashMap<K, V>,
    /// Usage order, least-recently-used at the front.
    order: VecDeque<K>,
    disposer: Option<Disposer<K, V>>,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// Create a cache that drops evicted values silently.
    ///
    /// A zero capacity is clamped to one so the cache can always hold the
    /// entry that was just inserted.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: AHashMap::new(),
            order: VecDeque::new(),
            disposer: None,
        }
    }

    /// Create a cache that runs `disposer` on every evicted entry.
    pub fn with_disposer(capacity: usize, disposer: impl FnMut(&K, V) + 'static) -> Self {
        let mut cache = Self::new(capacity);
        cache.disposer = Some(Box::new(disposer));
        cache
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up an entry, promoting it to most-recently-used.
    pub fn get(&mut self, key: &K) -> Option<&mut V> {
        if self.entries.contains_key(key) {
            self.promote(key);
        }
        self.entries.get_mut(key)
    }

    /// Look up an entry without touching the usage order.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Insert or replace an entry, evicting the least-recently-used entry
    /// if the cache is over capacity afterwards.
    ///
    /// Replacing an existing key disposes the displaced value but does not
    /// count as an eviction.
    pub fn set(&mut self, key: K, value: V) {
        if let Some(old) = self.entries.insert(key.clone(), value) {
            if let Some(disposer) = self.disposer.as_mut() {
                disposer(&key, old);
            }
            self.promote(&key);
            return;
        }

        self.order.push_back(key);
        if self.entries.len() > self.capacity {
            self.evict_lru();
        }
    }

    /// Remove an entry without running the disposer, returning it.
    pub fn take(&mut self, key: &K) -> Option<V> {
        let value = self.entries.remove(key)?;
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        Some(value)
    }

    /// Dispose and drop every entry, least-recently-used first.
    pub fn drain(&mut self) {
        while let Some(key) = self.order.pop_front() {
            if let Some(value) = self.entries.remove(&key) {
                if let Some(disposer) = self.disposer.as_mut() {
                    disposer(&key, value);
                }
            }
        }
        self.entries.clear();
    }

    fn promote(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let key = self.order.remove(pos).unwrap();
            self.order.push_back(key);
        }
    }

    fn evict_lru(&mut self) {
        if let Some(key) = self.order.pop_front() {
            if let Some(value) = self.entries.remove(&key) {
                if let Some(disposer) = self.disposer.as_mut() {
                    disposer(&key, value);
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
