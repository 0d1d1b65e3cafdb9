//! Memoization capability shared by both provider layers.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::RwLock;

/// A key/value memo. Implementations must be safe for concurrent callers and a
/// completed `put` must be visible to every later `has`/`get`.
pub trait Cache<K, V>: Send + Sync {
    fn has(&self, key: &K) -> bool;
    fn get(&self, key: &K) -> Option<V>;
    fn put(&self, key: K, value: V);
}

/// A cache that never evicts. Entries live as long as the cache.
pub struct UnlimitedCache<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> UnlimitedCache<K, V> {
    pub fn new() -> Self {
        UnlimitedCache {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<K, V> Default for UnlimitedCache<K, V> {
    fn default() -> Self {
        UnlimitedCache::new()
    }
}

impl<K, V> Cache<K, V> for UnlimitedCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn has(&self, key: &K) -> bool {
        self.entries.read().contains_key(key)
    }

    fn get(&self, key: &K) -> Option<V> {
        self.entries.read().get(key).cloned()
    }

    fn put(&self, key: K, value: V) {
        self.entries.write().insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn put_then_get() {
        let cache = UnlimitedCache::new();
        assert!(!cache.has(&"a"));
        cache.put("a", 1);
        assert!(cache.has(&"a"));
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"b"), None);
    }

    #[test]
    fn put_replaces_existing_entry() {
        let cache = UnlimitedCache::new();
        cache.put("a", 1);
        cache.put("a", 2);
        assert_eq!(cache.get(&"a"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn visible_across_threads() {
        let cache: Arc<UnlimitedCache<String, usize>> = Arc::new(UnlimitedCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.put(format!("k{i}"), i))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 8);
        assert_eq!(cache.get(&"k3".to_string()), Some(3));
    }

    #[test]
    fn usable_as_trait_object() {
        let cache: Box<dyn Cache<String, u8>> = Box::new(UnlimitedCache::new());
        cache.put("x".into(), 9);
        assert!(cache.has(&"x".to_string()));
    }
}
