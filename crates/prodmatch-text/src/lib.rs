//! prodmatch-text
//!
//! Tantivy-backed product catalog. `TantivyCatalog` indexes
//! [`CatalogProduct`] records and answers `CatalogSearch` queries with
//! BM25-ranked, published-only hits and optional category filtering.

pub mod catalog;
pub mod product;
pub mod search;
pub mod tantivy_utils;

pub use catalog::TantivyCatalog;
pub use product::{load_products, CatalogProduct};
