//! In-memory transform cache.

use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;

use parking_lot::RwLock;
use tracing::debug;

use crate::{CacheKey, CachedArtifact};

/// Default number of entries kept before the oldest is evicted.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Default)]
struct Entries {
    /// Stored artifacts.
    artifacts: HashMap<CacheKey, CachedArtifact>,
    /// Keys in insertion order, oldest first.
    order: VecDeque<CacheKey>,
}

/// Maps `(path, source hash)` keys to previously produced CSS.
///
/// All operations take `&self`, so a single cache can be shared between
/// concurrent pipeline runs behind an `Arc`. Each operation is atomic with
/// respect to the others.
///
/// When bounded, storing a new key into a full cache evicts the key that was
/// inserted first. Lookups never reorder entries.
pub struct TransformCache {
    entries: RwLock<Entries>,
    /// Maximum number of entries, `None` when unbounded.
    capacity: Option<NonZeroUsize>,
}

impl TransformCache {
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// A capacity of zero creates an unbounded cache.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            capacity: NonZeroUsize::new(capacity),
        }
    }

    /// Creates a cache with no size bound.
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Computes the BLAKE3 hash of content.
    pub fn hash_content(content: &str) -> String {
        blake3::hash(content.as_bytes()).to_hex().to_string()
    }

    /// Returns the configured capacity, or `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity.map(NonZeroUsize::get)
    }

    /// Returns the artifact stored under `key`, if any.
    pub fn lookup(&self, key: &CacheKey) -> Option<CachedArtifact> {
        self.entries.read().artifacts.get(key).cloned()
    }

    /// Returns true if an artifact is stored under `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.read().artifacts.contains_key(key)
    }

    /// Stores an artifact, replacing any previous one with the same key.
    pub fn store(&self, key: CacheKey, artifact: CachedArtifact) {
        let mut entries = self.entries.write();

        if let Some(existing) = entries.artifacts.get_mut(&key) {
            *existing = artifact;
            return;
        }

        if let Some(capacity) = self.capacity {
            while entries.artifacts.len() >= capacity.get() {
                let Some(oldest) = entries.order.pop_front() else {
                    break;
                };
                entries.artifacts.remove(&oldest);
                debug!("Evicted cache entry {}", oldest);
            }
        }

        entries.order.push_back(key.clone());
        entries.artifacts.insert(key, artifact);
    }

    /// Removes all entries.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.artifacts.clear();
        entries.order.clear();
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().artifacts.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().artifacts.is_empty()
    }
}

impl Default for TransformCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for TransformCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn key(path: &str, hash: &str) -> CacheKey {
        CacheKey::new(path, hash)
    }

    #[test]
    fn test_cache_new_is_empty() {
        let cache = TransformCache::new(8);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), Some(8));
    }

    #[test]
    fn test_cache_default() {
        let cache = TransformCache::default();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), Some(DEFAULT_CAPACITY));
    }

    #[test]
    fn test_cache_zero_capacity_is_unbounded() {
        assert_eq!(TransformCache::new(0).capacity(), None);
        assert_eq!(TransformCache::unbounded().capacity(), None);
    }

    #[test]
    fn test_lookup_missing_entry() {
        let cache = TransformCache::new(8);
        assert!(cache.lookup(&key("a.styl", "h1")).is_none());
    }

    #[test]
    fn test_store_then_lookup() {
        let cache = TransformCache::new(8);
        cache.store(key("a.styl", "h1"), CachedArtifact::new("a{color:red}"));

        assert_eq!(
            cache.lookup(&key("a.styl", "h1")),
            Some(CachedArtifact::new("a{color:red}"))
        );
        assert!(cache.contains(&key("a.styl", "h1")));
        assert_eq!(cache.len(), 1);
    }

    #[rstest]
    #[case::different_hash("a.styl", "h2")]
    #[case::different_path("b.styl", "h1")]
    fn test_lookup_requires_exact_key(#[case] path: &str, #[case] hash: &str) {
        let cache = TransformCache::new(8);
        cache.store(key("a.styl", "h1"), CachedArtifact::new("a{}"));

        assert!(cache.lookup(&key(path, hash)).is_none());
    }

    #[test]
    fn test_store_overwrites_same_key() {
        let cache = TransformCache::new(8);
        cache.store(key("a.styl", "h1"), CachedArtifact::new("first"));
        cache.store(key("a.styl", "h1"), CachedArtifact::new("second"));

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.lookup(&key("a.styl", "h1")).map(|a| a.css),
            Some("second".to_string())
        );
    }

    #[test]
    fn test_store_evicts_oldest_when_full() {
        let cache = TransformCache::new(2);
        cache.store(key("a.styl", "h"), CachedArtifact::new("a"));
        cache.store(key("b.styl", "h"), CachedArtifact::new("b"));

        // Lookups do not refresh an entry's position.
        assert!(cache.lookup(&key("a.styl", "h")).is_some());

        cache.store(key("c.styl", "h"), CachedArtifact::new("c"));

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&key("a.styl", "h")));
        assert!(cache.contains(&key("b.styl", "h")));
        assert!(cache.contains(&key("c.styl", "h")));
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = TransformCache::new(2);
        cache.store(key("a.styl", "h"), CachedArtifact::new("a"));
        cache.store(key("b.styl", "h"), CachedArtifact::new("b"));
        cache.store(key("b.styl", "h"), CachedArtifact::new("b2"));

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&key("a.styl", "h")));
    }

    #[test]
    fn test_unbounded_cache_keeps_everything() {
        let cache = TransformCache::unbounded();
        for i in 0..(DEFAULT_CAPACITY + 10) {
            cache.store(key(&format!("f{}.styl", i), "h"), CachedArtifact::new(""));
        }

        assert_eq!(cache.len(), DEFAULT_CAPACITY + 10);
    }

    #[test]
    fn test_clear() {
        let cache = TransformCache::new(8);
        for i in 0..5 {
            cache.store(key(&format!("f{}.styl", i), "h"), CachedArtifact::new(""));
        }
        assert_eq!(cache.len(), 5);

        cache.clear();
        assert!(cache.is_empty());

        // Eviction order is reset along with the entries.
        cache.store(key("x.styl", "h"), CachedArtifact::new("x"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_hash_content() {
        let hash1 = TransformCache::hash_content("body\n  color red");
        let hash2 = TransformCache::hash_content("body\n  color red");
        let hash3 = TransformCache::hash_content("body\n  color blue");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_cache_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(TransformCache::unbounded());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..50 {
                        let k = key(&format!("t{}/f{}.styl", t, i), "h");
                        cache.store(k.clone(), CachedArtifact::new(format!("{}", i)));
                        assert!(cache.lookup(&k).is_some());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 200);
    }
}
