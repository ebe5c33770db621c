use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;

pub struct Cache<K, V> {
    inner: LruCache<K, V>,
}

impl<K: Hash + Eq, V> Cache<K, V> {
    /// A zero capacity is bumped to one entry.
    pub fn new(capacity: usize) -> Self {
        Cache {
            inner: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.inner.put(key, value);
    }

    /// Drop every entry whose value matches.
    pub fn retain_values<F>(&mut self, mut keep: F)
    where
        F: FnMut(&V) -> bool,
        K: Clone,
    {
        let stale: Vec<K> = self
            .inner
            .iter()
            .filter(|(_, v)| !keep(v))
            .map(|(k, _)| k.clone())
            .collect();
        for key in stale {
            self.inner.pop(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
