//! Enhancement Result Cache
//!
//! Opt-in, byte-budgeted LRU cache for enhancement results, keyed by the
//! source image's fingerprint plus its category. Classification is a pure
//! function of the pixels, so an identical upload routed the same way can
//! reuse the previous result instead of paying for another generation.
//!
//! Disabled by default: a budget of zero caches nothing, preserving the
//! stateless per-request contract unless a caller opts in.

use std::collections::HashMap;
use std::time::Instant;

use crate::analysis::Category;

use super::traits::Enhanced;

/// Cache key: one image, one route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// CRC32 fingerprint of the source image.
    pub fingerprint: u32,
    /// Category the image was routed under.
    pub category: Category,
}

/// A cached result with access metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached enhancement result.
    pub result: Enhanced,
    /// Approximate size in bytes, counted against the budget.
    pub size_bytes: usize,
    /// When this entry was created.
    pub created_at: Instant,
    /// When this entry was last read.
    pub last_accessed: Instant,
    /// Number of reads.
    pub access_count: u64,
}

impl CacheEntry {
    fn new(result: Enhanced) -> Self {
        let size_bytes = result.size_bytes();
        let now = Instant::now();
        Self {
            result,
            size_bytes,
            created_at: now,
            last_accessed: now,
            access_count: 0,
        }
    }

    fn touch(&mut self) {
        self.last_accessed = Instant::now();
        self.access_count = self.access_count.saturating_add(1);
    }
}

/// Running cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found an entry.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Successful insertions.
    pub insertions: u64,
    /// Entries evicted to make room.
    pub evictions: u64,
    /// Current memory usage in bytes.
    pub used_bytes: usize,
    /// Current entry count.
    pub entry_count: usize,
}

/// Byte-budgeted LRU cache for [`Enhanced`] results.
#[derive(Debug)]
pub struct EnhancementCache {
    entries: HashMap<CacheKey, CacheEntry>,
    budget_bytes: usize,
    used_bytes: usize,
    hits: u64,
    misses: u64,
    insertions: u64,
    evictions: u64,
}

impl EnhancementCache {
    /// Create a cache with the given byte budget. A budget of zero disables
    /// caching entirely.
    #[must_use]
    pub fn new(budget_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            budget_bytes,
            used_bytes: 0,
            hits: 0,
            misses: 0,
            insertions: 0,
            evictions: 0,
        }
    }

    /// Whether this cache can hold anything at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.budget_bytes > 0
    }

    /// Look up a result, updating LRU metadata on hit.
    pub fn get(&mut self, key: &CacheKey) -> Option<Enhanced> {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.touch();
            self.hits += 1;
            Some(entry.result.clone())
        } else {
            if self.is_enabled() {
                self.misses += 1;
            }
            None
        }
    }

    /// Insert a result, evicting least-recently-used entries until it fits.
    ///
    /// Results larger than the whole budget (and everything, when the
    /// budget is zero) are silently not cached; the cache is an
    /// optimization, never a correctness requirement.
    pub fn insert(&mut self, key: CacheKey, result: Enhanced) {
        let entry = CacheEntry::new(result);
        if entry.size_bytes > self.budget_bytes {
            return;
        }

        if let Some(old) = self.entries.remove(&key) {
            self.used_bytes = self.used_bytes.saturating_sub(old.size_bytes);
        }

        while self.used_bytes + entry.size_bytes > self.budget_bytes {
            if !self.evict_lru() {
                return;
            }
        }

        self.used_bytes += entry.size_bytes;
        self.entries.insert(key, entry);
        self.insertions += 1;
    }

    /// Evict the least recently used entry. Returns `false` when the cache
    /// is already empty.
    fn evict_lru(&mut self) -> bool {
        let Some(key) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| *key)
        else {
            return false;
        };
        if let Some(entry) = self.entries.remove(&key) {
            self.used_bytes = self.used_bytes.saturating_sub(entry.size_bytes);
            self.evictions += 1;
        }
        true
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            insertions: self.insertions,
            evictions: self.evictions,
            used_bytes: self.used_bytes,
            entry_count: self.entries.len(),
        }
    }

    /// Drop every entry, keeping the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.used_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(fingerprint: u32) -> CacheKey {
        CacheKey {
            fingerprint,
            category: Category::A,
        }
    }

    fn remote(url: &str) -> Enhanced {
        Enhanced::Remote {
            image_url: url.to_string(),
        }
    }

    #[test]
    fn test_zero_budget_caches_nothing() {
        let mut cache = EnhancementCache::new(0);
        assert!(!cache.is_enabled());
        cache.insert(key(1), remote("https://x/a.png"));
        assert_eq!(cache.get(&key(1)), None);
        assert_eq!(cache.stats().entry_count, 0);
    }

    #[test]
    fn test_hit_and_miss_counting() {
        let mut cache = EnhancementCache::new(1024 * 1024);
        assert_eq!(cache.get(&key(1)), None);

        cache.insert(key(1), remote("https://x/a.png"));
        assert_eq!(cache.get(&key(1)), Some(remote("https://x/a.png")));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.insertions, 1);
    }

    #[test]
    fn test_category_is_part_of_the_key() {
        let mut cache = EnhancementCache::new(1024 * 1024);
        cache.insert(key(1), remote("https://x/a.png"));

        let other = CacheKey {
            fingerprint: 1,
            category: Category::B,
        };
        assert_eq!(cache.get(&other), None);
    }

    #[test]
    fn test_lru_eviction_under_budget_pressure() {
        // Budget fits roughly two entries of this size.
        let payload = "u".repeat(400);
        let entry_size = remote(&payload).size_bytes();
        let mut cache = EnhancementCache::new(entry_size * 2);

        cache.insert(key(1), remote(&payload));
        cache.insert(key(2), remote(&payload));

        // Touch key 1 so key 2 becomes the LRU victim.
        assert!(cache.get(&key(1)).is_some());
        cache.insert(key(3), remote(&payload));

        assert!(cache.get(&key(1)).is_some());
        assert_eq!(cache.get(&key(2)), None);
        assert!(cache.get(&key(3)).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_oversized_entry_is_skipped() {
        let mut cache = EnhancementCache::new(64);
        cache.insert(key(1), remote(&"u".repeat(10_000)));
        assert_eq!(cache.stats().entry_count, 0);
        assert_eq!(cache.stats().insertions, 0);
    }

    #[test]
    fn test_reinsert_replaces_and_tracks_bytes() {
        let mut cache = EnhancementCache::new(1024 * 1024);
        cache.insert(key(1), remote("https://x/a.png"));
        let first_used = cache.stats().used_bytes;

        cache.insert(key(1), remote("https://x/a-much-longer-url.png"));
        let stats = cache.stats();
        assert_eq!(stats.entry_count, 1);
        assert!(stats.used_bytes > first_used);
    }

    #[test]
    fn test_clear_keeps_counters() {
        let mut cache = EnhancementCache::new(1024 * 1024);
        cache.insert(key(1), remote("https://x/a.png"));
        assert!(cache.get(&key(1)).is_some());

        cache.clear();
        assert_eq!(cache.stats().entry_count, 0);
        assert_eq!(cache.stats().used_bytes, 0);
        assert_eq!(cache.stats().hits, 1);
    }
}
