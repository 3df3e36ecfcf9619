use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use prodmatch_core::types::ProductId;

pub const PLACEHOLDER_IMAGE_URL: &str = "/images/placeholder.png";
pub const PRICE_NOT_AVAILABLE: &str = "Price not available";

/// A product record as exported from the shop, the unit of indexing.
///
/// Only `status == "publish"` products are ever returned by searches.
/// A hit is purchasable when the product is both purchasable and in stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub price_html: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub permalink: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_true")]
    pub purchasable: bool,
    #[serde(default = "default_true")]
    pub in_stock: bool,
}

fn default_status() -> String {
    "publish".to_string()
}

fn default_true() -> bool {
    true
}

impl CatalogProduct {
    pub fn is_published(&self) -> bool {
        self.status == "publish"
    }

    pub fn is_available(&self) -> bool {
        self.purchasable && self.in_stock
    }

    pub fn display_price(&self) -> &str {
        self.price_html.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or(PRICE_NOT_AVAILABLE)
    }

    pub fn display_image(&self) -> &str {
        self.image_url.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or(PLACEHOLDER_IMAGE_URL)
    }

    /// Category names as stored in the index facet: trimmed and lower-cased.
    pub fn category_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .categories
            .iter()
            .map(|c| category_key(c))
            .filter(|c| !c.is_empty())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

pub fn category_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Read a JSON array of products from disk.
pub fn load_products(path: &Path) -> anyhow::Result<Vec<CatalogProduct>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading catalog {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing catalog {}", path.display()))
}
