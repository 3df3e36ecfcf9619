//! Domain types shared by the query builder, catalog adapters and engine.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub type ProductId = u64;

/// One product candidate extracted from an image.
///
/// Every attribute is optional: the extractor fills what it can see.
/// `color` and `material` are comma-joined lists. `keywords` keeps the
/// extractor's relevance order. Decoding is lenient: non-string scalars are
/// stringified, other shapes become `None`, and a `keywords` value that is
/// not an array decodes as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifiedItem {
    #[serde(deserialize_with = "lenient_string")]
    pub brand: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub product_name: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub size: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub visible_text: Option<String>,
    #[serde(deserialize_with = "lenient_keywords")]
    pub keywords: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub color: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub material: Option<String>,
}

/// Trimmed, non-empty view of an optional attribute.
pub fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl IdentifiedItem {
    pub fn named(product_name: &str) -> Self {
        Self { product_name: Some(product_name.to_string()), ..Self::default() }
    }

    /// Comma-separated `color` tokens, trimmed, empties dropped.
    pub fn colors(&self) -> Vec<&str> {
        split_list(self.color.as_deref())
    }

    /// Comma-separated `material` tokens, trimmed, empties dropped.
    pub fn materials(&self) -> Vec<&str> {
        split_list(self.material.as_deref())
    }

    /// Append color and material tokens missing from `keywords`, in order.
    pub fn merge_attribute_keywords(&mut self) {
        let extra: Vec<String> = self
            .colors()
            .into_iter()
            .chain(self.materials())
            .map(str::to_string)
            .collect();
        for token in extra {
            if !self.keywords.contains(&token) {
                self.keywords.push(token);
            }
        }
    }
}

fn split_list(raw: Option<&str>) -> Vec<&str> {
    raw.map(|s| s.split(',').map(str::trim).filter(|t| !t.is_empty()).collect())
        .unwrap_or_default()
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_keywords<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(values) => values
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Which tier of the waterfall a query belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum QueryTier {
    Direct,
    Broad,
}

/// Provenance label attached to a search outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Tier {
    Direct,
    Broad,
    TextSearch,
    None,
}

impl From<QueryTier> for Tier {
    fn from(tier: QueryTier) -> Self {
        match tier {
            QueryTier::Direct => Tier::Direct,
            QueryTier::Broad => Tier::Broad,
        }
    }
}

/// A catalog query built for one item. `category` is the raw item `type`;
/// adapters resolve it against their own category namespace and drop the
/// filter when it names nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub terms: Vec<String>,
    pub category: Option<String>,
    pub tier: QueryTier,
}

impl SearchQuery {
    pub fn direct(terms: Vec<String>, category: Option<String>) -> Self {
        Self { terms, category, tier: QueryTier::Direct }
    }

    pub fn broad(terms: Vec<String>, category: Option<String>) -> Self {
        Self { terms, category, tier: QueryTier::Broad }
    }

    /// Terms joined with single spaces, as sent to the catalog.
    pub fn text(&self) -> String {
        self.terms.join(" ")
    }
}

/// One product record as returned by the catalog.
///
/// `match_tier_origin` is the only field the engine writes; it is empty
/// until the aggregator stamps the hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogHit {
    pub id: ProductId,
    pub name: String,
    pub display_price: String,
    pub raw_price: Option<f64>,
    pub image_url: String,
    pub permalink_url: String,
    pub purchasable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_tier_origin: Option<Tier>,
}

/// Per-item outcome of the waterfall.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub items: Vec<CatalogHit>,
    pub tier: Tier,
}

impl MatchResult {
    pub fn none() -> Self {
        Self { items: Vec::new(), tier: Tier::None }
    }
}

/// Final output of one aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub identified_items: Vec<IdentifiedItem>,
    pub matching_products: Vec<CatalogHit>,
    pub overall_tier: Tier,
    pub extracted_text: Option<String>,
    /// The model's raw answer, when the result came from an extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}
