//! Caching system for compiled templates
//!
//! Compiled templates are cached per factory and per template identity, so
//! the fold cells inside a compiled template only ever hold values produced
//! by one factory. Entries of a factory are purged when its [`Htm`] is
//! dropped.
//!
//! [`Htm`]: crate::htm::Htm

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::compiler::CompiledTemplate;
use crate::htm::FactoryId;
use crate::types::TemplateId;

/// Cache entry with expiration support
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub created_at: Instant,
    pub expires_at: Option<Instant>,
    pub access_count: usize,
    /// Insertion order, for FIFO
    inserted: u64,
    /// Last access order, for LRU
    touched: u64,
}

impl<T> CacheEntry<T> {
    fn new(value: T, ttl: Option<Duration>, tick: u64) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            expires_at: ttl.map(|duration| now + duration),
            access_count: 0,
            inserted: tick,
            touched: tick,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires_at| Instant::now() > expires_at)
            .unwrap_or(false)
    }

    fn mark_accessed(&mut self, tick: u64) {
        self.access_count += 1;
        self.touched = tick;
    }

    pub fn age(&self) -> Duration {
        Instant::now().duration_since(self.created_at)
    }
}

/// Cache eviction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EvictionStrategy {
    /// Least Recently Used
    LRU,
    /// Least Frequently Used
    LFU,
    /// First In, First Out
    FIFO,
}

/// Generic cache with optional capacity and expiration
///
/// `max_size` of `None` means unbounded.
pub struct Cache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    max_size: Option<usize>,
    default_ttl: Option<Duration>,
    eviction_strategy: EvictionStrategy,
    tick: u64,
    hits: usize,
    misses: usize,
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(
        max_size: Option<usize>,
        default_ttl: Option<Duration>,
        eviction_strategy: EvictionStrategy,
    ) -> Self {
        Self {
            entries: HashMap::new(),
            max_size,
            default_ttl,
            eviction_strategy,
            tick: 0,
            hits: 0,
            misses: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.insert_with_ttl(key, value, self.default_ttl)
    }

    pub fn insert_with_ttl(&mut self, key: K, value: V, ttl: Option<Duration>) -> Option<V> {
        self.cleanup_expired();

        if let Some(max_size) = self.max_size {
            if max_size == 0 {
                return None;
            }
            if self.entries.len() >= max_size && !self.entries.contains_key(&key) {
                self.evict_one();
            }
        }

        let tick = self.next_tick();
        self.entries
            .insert(key, CacheEntry::new(value, ttl, tick))
            .map(|old_entry| old_entry.value)
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        let tick = self.next_tick();
        match self.entries.get_mut(key) {
            Some(entry) if entry.is_expired() => {
                self.entries.remove(key);
                self.misses += 1;
                None
            }
            Some(entry) => {
                entry.mark_accessed(tick);
                self.hits += 1;
                Some(entry.value.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Check for a live entry without touching statistics
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    /// Read a live entry without touching statistics or recency
    pub fn peek(&self, key: &K) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Keep only the entries whose key satisfies `keep`
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&K) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|key, _| keep(key));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            hit_rate: if self.hits + self.misses > 0 {
                self.hits as f64 / (self.hits + self.misses) as f64
            } else {
                0.0
            },
            entry_count: self.entries.len(),
            max_size: self.max_size,
        }
    }

    fn cleanup_expired(&mut self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| match entry.expires_at {
            Some(expires_at) => now <= expires_at,
            None => true,
        });
    }

    fn evict_one(&mut self) {
        let victim = match self.eviction_strategy {
            EvictionStrategy::LRU => self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.touched)
                .map(|(k, _)| k.clone()),
            EvictionStrategy::LFU => self
                .entries
                .iter()
                .min_by_key(|(_, entry)| (entry.access_count, entry.touched))
                .map(|(k, _)| k.clone()),
            EvictionStrategy::FIFO => self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted)
                .map(|(k, _)| k.clone()),
        };

        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub hit_rate: f64,
    pub entry_count: usize,
    pub max_size: Option<usize>,
}

/// Compiled template cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateCacheKey {
    pub factory: FactoryId,
    pub template: TemplateId,
}

impl TemplateCacheKey {
    pub fn new(factory: FactoryId, template: TemplateId) -> Self {
        Self { factory, template }
    }
}

/// Compiled template cache, shared between factories
pub struct TemplateCache {
    compiled_templates: Arc<RwLock<Cache<TemplateCacheKey, Arc<CompiledTemplate>>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            compiled_templates: Arc::new(RwLock::new(Cache::new(
                config.compiled_cache_size,
                config.compiled_ttl,
                config.eviction_strategy,
            ))),
        }
    }

    /// Get or create a compiled template
    ///
    /// Concurrent misses on the same key may both compile; the first insert
    /// wins and every caller gets that instance.
    pub fn get_or_compile_template<F>(
        &self,
        key: &TemplateCacheKey,
        compiler: F,
    ) -> Arc<CompiledTemplate>
    where
        F: FnOnce() -> Arc<CompiledTemplate>,
    {
        if let Ok(mut cache) = self.compiled_templates.write() {
            if let Some(template) = cache.get(key) {
                return template;
            }
        }

        let template = compiler();

        if let Ok(mut cache) = self.compiled_templates.write() {
            // Lost a race: the lookup above already counted as a miss.
            if let Some(existing) = cache.peek(key) {
                return existing;
            }
            cache.insert(key.clone(), Arc::clone(&template));
        }

        template
    }

    /// Drop every entry compiled for `factory`
    pub fn remove_factory(&self, factory: FactoryId) -> usize {
        let removed = self
            .compiled_templates
            .write()
            .map(|mut cache| cache.retain(|key| key.factory != factory))
            .unwrap_or(0);
        if removed > 0 {
            tracing::debug!(factory = factory.get(), removed, "purged compiled templates");
        }
        removed
    }

    pub fn clear_all(&self) {
        if let Ok(mut cache) = self.compiled_templates.write() {
            cache.clear();
        }
    }

    pub fn get_stats(&self) -> TemplateCacheStats {
        let compiled_templates = self
            .compiled_templates
            .read()
            .map(|cache| cache.stats())
            .unwrap_or_default();

        TemplateCacheStats { compiled_templates }
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Unbounded by default
    pub compiled_cache_size: Option<usize>,
    pub compiled_ttl: Option<Duration>,
    pub eviction_strategy: EvictionStrategy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            compiled_cache_size: None,
            compiled_ttl: None,
            eviction_strategy: EvictionStrategy::LRU,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateCacheStats {
    pub compiled_templates: CacheStats,
}

impl TemplateCacheStats {
    pub fn hit_rate(&self) -> f64 {
        self.compiled_templates.hit_rate
    }

    pub fn total_entries(&self) -> usize {
        self.compiled_templates.entry_count
    }
}

static GLOBAL_CACHE: OnceLock<Arc<TemplateCache>> = OnceLock::new();

/// Initialize the global cache with default settings
pub fn init_global_cache() {
    init_global_cache_with_config(CacheConfig::default());
}

/// Initialize the global cache; has no effect once it exists
pub fn init_global_cache_with_config(config: CacheConfig) {
    let _ = GLOBAL_CACHE.set(Arc::new(TemplateCache::with_config(config)));
}

pub fn get_global_cache() -> Arc<TemplateCache> {
    Arc::clone(GLOBAL_CACHE.get_or_init(|| Arc::new(TemplateCache::new())))
}

pub fn clear_global_cache() {
    get_global_cache().clear_all();
}

pub fn get_global_cache_stats() -> TemplateCacheStats {
    get_global_cache().get_stats()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use std::thread;

    #[test]
    fn test_cache_basic_operations() {
        let mut cache = Cache::new(Some(3), None, EvictionStrategy::LRU);

        cache.insert("key1", "value1");
        assert_eq!(cache.get(&"key1"), Some("value1"));
        assert_eq!(cache.get(&"nonexistent"), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 1);
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = Cache::new(Some(2), None, EvictionStrategy::LRU);

        cache.insert("key1", "value1");
        cache.insert("key2", "value2");
        cache.get(&"key1");
        cache.insert("key3", "value3"); // evicts key2

        assert_eq!(cache.get(&"key2"), None);
        assert_eq!(cache.get(&"key1"), Some("value1"));
        assert_eq!(cache.get(&"key3"), Some("value3"));
    }

    #[test]
    fn test_fifo_eviction() {
        let mut cache = Cache::new(Some(2), None, EvictionStrategy::FIFO);

        cache.insert("key1", "value1");
        cache.insert("key2", "value2");
        cache.get(&"key1");
        cache.insert("key3", "value3"); // evicts key1

        assert!(!cache.contains_key(&"key1"));
        assert!(cache.contains_key(&"key2"));
    }

    #[test]
    fn test_unbounded_cache() {
        let mut cache = Cache::new(None, None, EvictionStrategy::LRU);
        for i in 0..1000 {
            cache.insert(i, i);
        }
        assert_eq!(cache.len(), 1000);
        assert_eq!(cache.stats().max_size, None);
    }

    #[test]
    fn test_cache_expiration() {
        let mut cache = Cache::new(Some(10), None, EvictionStrategy::LRU);

        cache.insert_with_ttl("key1", "value1", Some(Duration::from_millis(1)));
        thread::sleep(Duration::from_millis(5));

        assert_eq!(cache.get(&"key1"), None);
    }

    #[test]
    fn test_cache_entry_lifecycle() {
        let entry = CacheEntry::new("test_value", Some(Duration::from_secs(60)), 1);

        assert!(!entry.is_expired());
        assert!(entry.age() < Duration::from_secs(1));
        assert_eq!(entry.access_count, 0);
    }

    #[test]
    fn test_template_cache_reuses_compilation() {
        let cache = TemplateCache::new();
        let key = TemplateCacheKey::new(FactoryId::next(), TemplateId::from("test:1:1"));

        let first = cache.get_or_compile_template(&key, || Compiler::compile(&["<p></p>"]));
        let second = cache.get_or_compile_template(&key, || panic!("compiled twice"));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.get_stats().compiled_templates.hits, 1);
    }

    #[test]
    fn test_racing_compile_keeps_first_insert() {
        let cache = TemplateCache::new();
        let key = TemplateCacheKey::new(FactoryId::next(), TemplateId::from("test:3:1"));

        let mut winner = None;
        let result = cache.get_or_compile_template(&key, || {
            winner = Some(cache.get_or_compile_template(&key, || Compiler::compile(&["<b></b>"])));
            Compiler::compile(&["<b></b>"])
        });

        let winner = winner.expect("inner lookup ran");
        assert!(Arc::ptr_eq(&result, &winner));

        let stats = cache.get_stats().compiled_templates;
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entry_count, 1);
    }

    #[test]
    fn test_remove_factory_only_touches_its_entries() {
        let cache = TemplateCache::new();
        let (a, b) = (FactoryId::next(), FactoryId::next());
        let id = TemplateId::from("test:2:1");

        cache.get_or_compile_template(&TemplateCacheKey::new(a, id.clone()), || {
            Compiler::compile(&["<a></a>"])
        });
        cache.get_or_compile_template(&TemplateCacheKey::new(b, id), || {
            Compiler::compile(&["<a></a>"])
        });

        assert_eq!(cache.remove_factory(a), 1);
        assert_eq!(cache.get_stats().total_entries(), 1);
    }

    #[test]
    fn test_cache_config() {
        let config = CacheConfig::default();
        assert_eq!(config.compiled_cache_size, None);
        assert_eq!(config.eviction_strategy, EvictionStrategy::LRU);

        let custom_config = CacheConfig {
            compiled_cache_size: Some(50),
            eviction_strategy: EvictionStrategy::FIFO,
            ..Default::default()
        };
        assert_eq!(custom_config.compiled_cache_size, Some(50));
    }

    #[test]
    fn test_global_cache() {
        init_global_cache();
        let first = get_global_cache();
        let second = get_global_cache();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
