use prodmatch_core::config::MatchingSettings;
use prodmatch_core::traits::CatalogSearch;
use prodmatch_core::types::{CatalogHit, IdentifiedItem, MatchResult, QueryTier, SearchQuery};
use prodmatch_core::Error;

use crate::query::build_queries;

/// Per-tier hit limits. The broad tier fetches a few more than direct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub direct: usize,
    pub broad_extra: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self { direct: 8, broad_extra: 5 }
    }
}

impl SearchLimits {
    pub fn for_tier(&self, tier: QueryTier) -> usize {
        match tier {
            QueryTier::Direct => self.direct,
            QueryTier::Broad => self.direct + self.broad_extra,
        }
    }
}

impl From<&MatchingSettings> for SearchLimits {
    fn from(settings: &MatchingSettings) -> Self {
        Self { direct: settings.direct_limit, broad_extra: settings.broad_extra }
    }
}

/// Runs the direct-then-broad waterfall for one item at a time.
pub struct MatchingEngine<C> {
    catalog: C,
    limits: SearchLimits,
}

impl<C: CatalogSearch> MatchingEngine<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog, limits: SearchLimits::default() }
    }

    pub fn with_limits(catalog: C, limits: SearchLimits) -> Self {
        Self { catalog, limits }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn limits(&self) -> SearchLimits {
        self.limits
    }

    /// First tier with at least one hit wins; later tiers are never run.
    pub fn match_item(&self, item: &IdentifiedItem) -> MatchResult {
        for query in build_queries(item) {
            let hits = self.search(&query);
            if !hits.is_empty() {
                return MatchResult { items: hits, tier: query.tier.into() };
            }
            tracing::debug!(tier = ?query.tier, query = %query.text(), "no hits, falling back");
        }
        MatchResult::none()
    }

    /// One catalog call. Failures are logged and count as zero hits.
    fn search(&self, query: &SearchQuery) -> Vec<CatalogHit> {
        let limit = self.limits.for_tier(query.tier);
        match self.catalog.search(query, limit) {
            Ok(hits) => {
                tracing::debug!(tier = ?query.tier, limit, hits = hits.len(), "catalog search");
                hits
            }
            Err(e) => {
                let err = Error::CatalogUnavailable(format!("{e:#}"));
                tracing::warn!(tier = ?query.tier, error = %err, "catalog search failed, treating as no hits");
                Vec::new()
            }
        }
    }

    /// Free-text lookup with the same failure policy as tiered searches.
    pub fn search_text(&self, text: &str, limit: usize) -> Vec<CatalogHit> {
        match self.catalog.search_text(text, limit) {
            Ok(hits) => {
                tracing::debug!(limit, hits = hits.len(), "catalog text search");
                hits
            }
            Err(e) => {
                let err = Error::CatalogUnavailable(format!("{e:#}"));
                tracing::warn!(error = %err, "catalog text search failed, treating as no hits");
                Vec::new()
            }
        }
    }
}
