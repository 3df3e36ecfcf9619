use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use prodmatch_core::config::MatchingSettings;
use prodmatch_core::normalize;
use prodmatch_core::traits::CatalogSearch;
use prodmatch_core::types::{CatalogHit, SearchQuery};

const DEFAULT_CAPACITY: u64 = 1_024;
const DEFAULT_IDLE: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Query { text: String, category: Option<String> },
    FreeText(String),
}

struct Entry {
    limit: usize,
    hits: Vec<CatalogHit>,
}

impl Entry {
    /// A cached answer serves `limit` if it was fetched with at least that
    /// limit, or if it came back short (the catalog has nothing more).
    fn serves(&self, limit: usize) -> bool {
        self.limit >= limit || self.hits.len() < self.limit
    }
}

/// Memoizes answers of one catalog, keyed on the normalized query text and
/// category. Failed calls are not cached.
///
/// Entries are bounded by count and expire after sitting unread for the idle
/// period. Each instance owns its cache; wrapping two catalogs gives two
/// caches.
pub struct CachedCatalog<C> {
    inner: C,
    entries: Cache<CacheKey, Arc<Entry>>,
}

impl<C: CatalogSearch> CachedCatalog<C> {
    pub fn new(inner: C) -> Self {
        Self::with_capacity(inner, DEFAULT_CAPACITY, DEFAULT_IDLE)
    }

    pub fn with_capacity(inner: C, max_entries: u64, time_to_idle: Duration) -> Self {
        let entries = Cache::builder().max_capacity(max_entries).time_to_idle(time_to_idle).build();
        Self { inner, entries }
    }

    pub fn from_settings(inner: C, settings: &MatchingSettings) -> Self {
        Self::with_capacity(inner, settings.cache_capacity, settings.cache_idle())
    }

    /// Entries currently held, after pending evictions have run.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached<F>(&self, key: CacheKey, limit: usize, fetch: F) -> anyhow::Result<Vec<CatalogHit>>
    where
        F: FnOnce() -> anyhow::Result<Vec<CatalogHit>>,
    {
        let old = self.entries.get(&key);
        if let Some(entry) = old.as_ref().filter(|e| e.serves(limit)) {
            tracing::trace!(?key, limit, "catalog cache hit");
            return Ok(entry.hits.iter().take(limit).cloned().collect());
        }
        let hits = fetch()?;
        if old.map_or(true, |old| old.limit < limit) {
            self.entries.insert(key, Arc::new(Entry { limit, hits: hits.clone() }));
        }
        Ok(hits)
    }
}

impl<C: CatalogSearch> CatalogSearch for CachedCatalog<C> {
    fn search(&self, query: &SearchQuery, limit: usize) -> anyhow::Result<Vec<CatalogHit>> {
        let key = CacheKey::Query {
            text: normalize(&query.text()),
            category: query.category.as_deref().map(|c| c.trim().to_lowercase()),
        };
        self.cached(key, limit, || self.inner.search(query, limit))
    }

    fn search_text(&self, text: &str, limit: usize) -> anyhow::Result<Vec<CatalogHit>> {
        self.cached(CacheKey::FreeText(normalize(text)), limit, || self.inner.search_text(text, limit))
    }
}
