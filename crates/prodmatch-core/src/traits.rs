use std::sync::Arc;

use crate::types::{CatalogHit, IdentifiedItem, SearchQuery};

/// Product catalog as seen by the matching engine.
///
/// Hits come back ranked by the catalog's own relevance scoring and only
/// include published products. An unknown `query.category` is ignored, not
/// an error. Any `Err` is treated by callers as the catalog being
/// unavailable for that one call.
pub trait CatalogSearch: Send + Sync {
    fn search(&self, query: &SearchQuery, limit: usize) -> anyhow::Result<Vec<CatalogHit>>;

    /// Free-text lookup that bypasses structured query building.
    fn search_text(&self, text: &str, limit: usize) -> anyhow::Result<Vec<CatalogHit>>;
}

/// Receives items (or raw text) the catalog could not match. Best effort:
/// callers log and drop errors.
pub trait Notifier: Send + Sync {
    fn notify(&self, items: &[IdentifiedItem], text: Option<&str>) -> anyhow::Result<()>;
}

impl<T: CatalogSearch + ?Sized> CatalogSearch for &T {
    fn search(&self, query: &SearchQuery, limit: usize) -> anyhow::Result<Vec<CatalogHit>> {
        (**self).search(query, limit)
    }
    fn search_text(&self, text: &str, limit: usize) -> anyhow::Result<Vec<CatalogHit>> {
        (**self).search_text(text, limit)
    }
}

impl<T: CatalogSearch + ?Sized> CatalogSearch for Box<T> {
    fn search(&self, query: &SearchQuery, limit: usize) -> anyhow::Result<Vec<CatalogHit>> {
        (**self).search(query, limit)
    }
    fn search_text(&self, text: &str, limit: usize) -> anyhow::Result<Vec<CatalogHit>> {
        (**self).search_text(text, limit)
    }
}

impl<T: CatalogSearch + ?Sized> CatalogSearch for Arc<T> {
    fn search(&self, query: &SearchQuery, limit: usize) -> anyhow::Result<Vec<CatalogHit>> {
        (**self).search(query, limit)
    }
    fn search_text(&self, text: &str, limit: usize) -> anyhow::Result<Vec<CatalogHit>> {
        (**self).search_text(text, limit)
    }
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn notify(&self, items: &[IdentifiedItem], text: Option<&str>) -> anyhow::Result<()> {
        (**self).notify(items, text)
    }
}
