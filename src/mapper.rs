//! Column-name normalization with caching.
//!
//! The mapper resolves raw result-column names to the form matched against
//! destination struct fields. The default normalization is ASCII
//! lowercasing; custom renames on the destination side are expressed with
//! `#[serde(rename = "...")]`.
//!
//! Normalization is cheap but happens on every scan of every result set, so
//! the mapper keeps an O(1) LRU cache from a column-name list to its
//! normalized form, shared behind `Arc`.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

/// A name-normalization function applied to every column name.
pub type NameFn = fn(&str) -> String;

/// Default normalization: lowercase the column name.
pub fn lowercase(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Default cache capacity (distinct column lists, not columns).
const DEFAULT_CACHE_CAPACITY: usize = 256;

// Created lazily so the default mapper is only built when scanning is
// actually used.
static DEFAULT_MAPPER: Lazy<Arc<Mapper>> = Lazy::new(|| Arc::new(Mapper::new(lowercase)));

/// Get the process-wide default mapper (lowercase normalization).
pub fn default_mapper() -> Arc<Mapper> {
    Arc::clone(&DEFAULT_MAPPER)
}

/// A cached column-name normalizer.
pub struct Mapper {
    name_fn: NameFn,
    /// Cache key is the raw column names joined with NUL (a character that
    /// cannot appear in a PostgreSQL identifier).
    cache: Mutex<LruCache<String, Arc<[String]>>>,
}

impl Mapper {
    /// Create a mapper with the given normalization function.
    pub fn new(name_fn: NameFn) -> Self {
        Self::with_capacity(name_fn, DEFAULT_CACHE_CAPACITY)
    }

    /// Create a mapper with an explicit cache capacity.
    pub fn with_capacity(name_fn: NameFn, capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            name_fn,
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Normalize a single name.
    #[inline]
    pub fn normalize(&self, name: &str) -> String {
        (self.name_fn)(name)
    }

    /// Normalize a full column list, consulting the cache first.
    ///
    /// The returned slice is shared; repeated scans of result sets with the
    /// same shape only pay for a cache lookup.
    pub fn normalized(&self, columns: &[String]) -> Arc<[String]> {
        let key = columns.join("\0");

        let mut cache = self.cache.lock();
        if let Some(found) = cache.get(&key) {
            return Arc::clone(found);
        }

        let normalized: Arc<[String]> =
            columns.iter().map(|c| (self.name_fn)(c)).collect();
        cache.put(key, Arc::clone(&normalized));
        normalized
    }

    /// Number of cached column lists.
    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Drop all cached entries.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new(lowercase)
    }
}

impl std::fmt::Debug for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("cached_lists", &self.cache_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_lowercase_default() {
        let mapper = Mapper::default();
        let normalized = mapper.normalized(&cols(&["ID", "UserName", "created_at"]));
        assert_eq!(&*normalized, &["id", "username", "created_at"]);
    }

    #[test]
    fn test_cache_hit_shares_allocation() {
        let mapper = Mapper::new(lowercase);
        let first = mapper.normalized(&cols(&["A", "B"]));
        let second = mapper.normalized(&cols(&["A", "B"]));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(mapper.cache_len(), 1);
    }

    #[test]
    fn test_distinct_lists_cached_separately() {
        let mapper = Mapper::new(lowercase);
        mapper.normalized(&cols(&["a"]));
        mapper.normalized(&cols(&["a", "b"]));
        assert_eq!(mapper.cache_len(), 2);
    }

    #[test]
    fn test_lru_eviction() {
        let mapper = Mapper::with_capacity(lowercase, 2);
        let first = mapper.normalized(&cols(&["a"]));
        mapper.normalized(&cols(&["b"]));
        mapper.normalized(&cols(&["c"]));
        assert_eq!(mapper.cache_len(), 2);

        // "a" was evicted; normalizing it again builds a fresh allocation.
        let again = mapper.normalized(&cols(&["a"]));
        assert!(!Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn test_custom_name_fn() {
        fn snakeish(name: &str) -> String {
            name.to_ascii_lowercase().replace(' ', "_")
        }
        let mapper = Mapper::new(snakeish);
        let normalized = mapper.normalized(&cols(&["Full Name"]));
        assert_eq!(&*normalized, &["full_name"]);
    }

    #[test]
    fn test_default_mapper_is_shared() {
        let a = default_mapper();
        let b = default_mapper();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
