use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use prodmatch_core::config::Settings;
use prodmatch_core::extraction::Extraction;
use prodmatch_core::traits::{CatalogSearch, Notifier};
use prodmatch_core::types::{AggregatedResult, CatalogHit, IdentifiedItem, ProductId, Tier};

use crate::matcher::MatchingEngine;
use crate::notify::sanitize_target;

/// Settings the aggregator needs for one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    pub max_results: usize,
    pub notifications_enabled: bool,
    pub notify_target: Option<String>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self { max_results: 5, notifications_enabled: false, notify_target: None }
    }
}

impl From<&Settings> for AggregatorConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            max_results: settings.matching.max_results,
            notifications_enabled: settings.notifications.enabled,
            notify_target: settings.notifications.target.clone(),
        }
    }
}

impl AggregatorConfig {
    /// Digits-only target when notifications are switched on and a usable
    /// target is configured.
    pub fn notification_target(&self) -> Option<String> {
        if !self.notifications_enabled { return None; }
        let target = sanitize_target(self.notify_target.as_deref()?);
        (!target.is_empty()).then_some(target)
    }
}

/// How a request is searched, decided before any catalog call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchPlan<'a> {
    /// No items but a single word of text: one free-text lookup.
    SingleWord(&'a str),
    /// One waterfall per item, in item order.
    PerItem,
    Nothing,
}

fn plan<'a>(items: &[IdentifiedItem], extracted_text: Option<&'a str>) -> SearchPlan<'a> {
    if !items.is_empty() {
        return SearchPlan::PerItem;
    }
    match extracted_text.map(str::trim) {
        Some(word) if word.chars().count() > 1 && !word.contains(char::is_whitespace) => SearchPlan::SingleWord(word),
        _ => SearchPlan::Nothing,
    }
}

/// Hits in first-seen order, at most one per catalog id.
#[derive(Default)]
struct OrderedHits {
    hits: Vec<CatalogHit>,
    seen: HashSet<ProductId>,
}

impl OrderedHits {
    fn extend(&mut self, hits: Vec<CatalogHit>, tier: Tier) {
        for mut hit in hits {
            if self.seen.insert(hit.id) {
                hit.match_tier_origin = Some(tier);
                self.hits.push(hit);
            }
        }
    }

    fn into_capped(mut self, max_results: usize) -> Vec<CatalogHit> {
        self.hits.truncate(max_results);
        self.hits
    }
}

/// Collapses per-item waterfall results into one response and raises the
/// unmatched notification.
pub struct Aggregator<C> {
    engine: MatchingEngine<C>,
    config: AggregatorConfig,
    notifier: Option<Box<dyn Notifier>>,
}

impl<C: CatalogSearch> Aggregator<C> {
    pub fn new(engine: MatchingEngine<C>, config: AggregatorConfig) -> Self {
        Self { engine, config, notifier: None }
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn engine(&self) -> &MatchingEngine<C> {
        &self.engine
    }

    /// Aggregate a decoded extraction with the configured result cap.
    pub fn process(&self, extraction: Extraction) -> AggregatedResult {
        self.process_capped(extraction, self.config.max_results)
    }

    /// [`Aggregator::process`] with an explicit result cap; the model's raw
    /// answer is kept on the result.
    pub fn process_capped(&self, extraction: Extraction, max_results: usize) -> AggregatedResult {
        let mut result = self.process_search(extraction.products, extraction.extracted_text, max_results);
        result.raw_output = extraction.raw_output;
        result
    }

    pub fn process_search(
        &self,
        items: Vec<IdentifiedItem>,
        extracted_text: Option<String>,
        max_results: usize,
    ) -> AggregatedResult {
        let mut found = OrderedHits::default();
        let plan = plan(&items, extracted_text.as_deref());
        match plan {
            SearchPlan::SingleWord(word) => {
                tracing::info!(word, "no items identified, searching extracted text");
                found.extend(self.engine.search_text(word, max_results), Tier::TextSearch);
            }
            SearchPlan::PerItem => {
                for (index, item) in items.iter().enumerate() {
                    let result = self.engine.match_item(item);
                    tracing::debug!(index, tier = ?result.tier, hits = result.items.len(), "item matched");
                    found.extend(result.items, result.tier);
                }
            }
            SearchPlan::Nothing => tracing::info!("no items and no usable text, nothing to search"),
        }

        let matching_products = found.into_capped(max_results);
        let overall_tier = overall_tier(&matching_products, matches!(plan, SearchPlan::SingleWord(_)));
        tracing::info!(products = matching_products.len(), ?overall_tier, "search aggregated");

        if matching_products.is_empty() {
            self.notify_unmatched(&items, extracted_text.as_deref());
        }
        AggregatedResult { identified_items: items, matching_products, overall_tier, extracted_text, raw_output: None }
    }

    fn notify_unmatched(&self, items: &[IdentifiedItem], extracted_text: Option<&str>) {
        let Some(notifier) = &self.notifier else { return };
        let Some(target) = self.config.notification_target() else {
            tracing::debug!("no matches, notifications disabled or target not set");
            return;
        };
        let outcome = if !items.is_empty() {
            tracing::info!(%target, items = items.len(), "no matches for identified items, notifying");
            notifier.notify(items, None)
        } else if let Some(text) = extracted_text.filter(|t| !t.is_empty()) {
            tracing::info!(%target, "no matches for extracted text, notifying");
            notifier.notify(&[], Some(text))
        } else {
            return;
        };
        if let Err(e) = outcome {
            tracing::warn!(error = %e, "notification failed");
        }
    }
}

/// `textSearch` when the single-word path found something; otherwise
/// `direct` if any retained hit came from a direct query, `broad` if there
/// are hits at all, `none` if not.
fn overall_tier(products: &[CatalogHit], single_word: bool) -> Tier {
    if products.is_empty() {
        Tier::None
    } else if single_word {
        Tier::TextSearch
    } else if products.iter().any(|p| p.match_tier_origin == Some(Tier::Direct)) {
        Tier::Direct
    } else {
        Tier::Broad
    }
}
