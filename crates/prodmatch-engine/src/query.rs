use std::collections::HashSet;

use prodmatch_core::normalize::{normalize, significant_tokens};
use prodmatch_core::types::{present, IdentifiedItem, SearchQuery};

/// Primary-term tokens must be longer than this to join the broad query.
const PRIMARY_TOKEN_MIN: usize = 2;
/// Visible-text tokens are noisier, so the bar is one character higher.
const VISIBLE_TOKEN_MIN: usize = 3;

/// Build the ordered query list for one item: the direct query, then the
/// broad fallback when it says something the direct query does not.
///
/// Returns an empty list when the item has neither a product name nor
/// visible text, or when the primary term normalizes to nothing.
pub fn build_queries(item: &IdentifiedItem) -> Vec<SearchQuery> {
    let Some(primary) = present(&item.product_name).or_else(|| present(&item.visible_text)) else {
        return Vec::new();
    };
    let direct_text = normalize(primary);
    if direct_text.is_empty() {
        tracing::debug!(primary, "primary term normalizes to nothing, no queries");
        return Vec::new();
    }

    let category = present(&item.kind).map(str::to_string);
    let direct = SearchQuery::direct(direct_text.split(' ').map(str::to_string).collect(), category.clone());

    let broad_terms = broad_terms(item, &direct_text);
    let broad_text = broad_terms.join(" ");
    let mut queries = vec![direct];
    if broad_terms.is_empty() {
        tracing::debug!(direct = %direct_text, "no broad terms");
    } else if broad_text.to_lowercase() == direct_text {
        tracing::debug!(direct = %direct_text, "broad query repeats direct query, suppressed");
    } else {
        tracing::debug!(direct = %direct_text, broad = %broad_text, "queries built");
        queries.push(SearchQuery::broad(broad_terms, category));
    }
    queries
}

/// Broad terms in priority order: brand, type, colors, materials, keywords,
/// long primary-term tokens, long visible-text tokens. Duplicates are
/// dropped case-insensitively, keeping the first spelling.
fn broad_terms(item: &IdentifiedItem, direct_text: &str) -> Vec<String> {
    let mut terms = TermList::default();
    if let Some(brand) = present(&item.brand) { terms.push(brand); }
    if let Some(kind) = present(&item.kind) { terms.push(kind); }
    for color in item.colors() { terms.push(color); }
    for material in item.materials() { terms.push(material); }
    for keyword in &item.keywords { terms.push(keyword); }
    for token in significant_tokens(direct_text, PRIMARY_TOKEN_MIN) { terms.push(&token); }
    if let Some(visible) = present(&item.visible_text) {
        for token in significant_tokens(visible, VISIBLE_TOKEN_MIN) { terms.push(&token); }
    }
    terms.terms
}

#[derive(Default)]
struct TermList {
    terms: Vec<String>,
    seen: HashSet<String>,
}

impl TermList {
    fn push(&mut self, term: &str) {
        let term = term.trim();
        if term.is_empty() { return; }
        if self.seen.insert(term.to_lowercase()) { self.terms.push(term.to_string()); }
    }
}
