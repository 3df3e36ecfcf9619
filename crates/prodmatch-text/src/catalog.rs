use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::RwLock;
use tantivy::collector::FacetCollector;
use tantivy::query::AllQuery;
use tantivy::schema::Facet;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use crate::product::{category_key, CatalogProduct};
use crate::tantivy_utils::{build_schema, register_tokenizer, CatalogFields};

/// A product catalog held in a Tantivy index, either in RAM or on disk.
///
/// The set of known category names is cached next to the reader and
/// refreshed on every commit, so category filters can be resolved without a
/// facet scan per query.
pub struct TantivyCatalog {
	pub(crate) index: Index,
	pub(crate) reader: IndexReader,
	pub(crate) fields: CatalogFields,
	categories: RwLock<HashSet<String>>,
}

impl TantivyCatalog {
	pub fn in_memory() -> Result<Self> {
		let index = Index::create_in_ram(build_schema());
		Self::from_index(index)
	}

	/// Create a fresh index in `index_dir`, wiping whatever was there.
	pub fn create(index_dir: PathBuf) -> Result<Self> {
		if index_dir.exists() { std::fs::remove_dir_all(&index_dir)?; }
		std::fs::create_dir_all(&index_dir)?;
		let index = Index::create_in_dir(&index_dir, build_schema())?;
		Self::from_index(index)
	}

	pub fn open(index_dir: PathBuf) -> Result<Self> {
		let index = Index::open_in_dir(&index_dir)?;
		Self::from_index(index)
	}

	fn from_index(index: Index) -> Result<Self> {
		register_tokenizer(&index);
		let fields = CatalogFields::from_schema(&index.schema())?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		let catalog = Self { index, reader, fields, categories: RwLock::new(HashSet::new()) };
		catalog.refresh_categories()?;
		Ok(catalog)
	}

	/// Add or replace products (keyed by id) and make them searchable.
	pub fn index_products(&self, products: &[CatalogProduct]) -> Result<usize> {
		let mut index_writer: IndexWriter = self.index.writer_with_num_threads(1, 50_000_000)?;
		for product in products {
			index_writer.delete_term(Term::from_field_u64(self.fields.id, product.id));
			index_writer.add_document(self.to_document(product))?;
		}
		index_writer.commit()?;
		self.reader.reload()?;
		self.refresh_categories()?;
		tracing::info!(products = products.len(), total = self.num_products(), "catalog indexed");
		Ok(products.len())
	}

	fn to_document(&self, product: &CatalogProduct) -> TantivyDocument {
		let f = &self.fields;
		let mut doc = TantivyDocument::default();
		doc.add_u64(f.id, product.id);
		doc.add_text(f.name, &product.name);
		doc.add_text(f.description, &product.description);
		for key in product.category_keys() {
			doc.add_facet(f.category, Facet::from_path([key]));
		}
		doc.add_u64(f.published, u64::from(product.is_published()));
		doc.add_text(f.price_html, product.display_price());
		if let Some(price) = product.price { doc.add_f64(f.price, price); }
		doc.add_text(f.image_url, product.display_image());
		doc.add_text(f.permalink, &product.permalink);
		doc.add_bool(f.purchasable, product.is_available());
		doc
	}

	pub fn num_products(&self) -> u64 {
		self.reader.searcher().num_docs()
	}

	/// Product counts per top-level category, across all statuses.
	pub fn category_counts(&self) -> Result<Vec<(String, u64)>> {
		let searcher = self.reader.searcher();
		let mut facet_collector = FacetCollector::for_field("category");
		facet_collector.add_facet(Facet::root());
		let facet_counts = searcher.search(&AllQuery, &facet_collector)?;
		let mut facets = Vec::new();
		for (facet, count) in facet_counts.get(&Facet::root().to_string()) {
			if let Some(name) = facet.to_path().last() { facets.push((name.to_string(), count)); }
		}
		Ok(facets)
	}

	fn refresh_categories(&self) -> Result<()> {
		let names: HashSet<String> = self.category_counts()?.into_iter().map(|(name, _)| name).collect();
		let mut categories = self.categories.write().map_err(|_| anyhow::anyhow!("category cache lock poisoned"))?;
		*categories = names;
		Ok(())
	}

	/// Facet key for `name` if the catalog has such a category.
	pub fn resolve_category(&self, name: &str) -> Option<String> {
		let key = category_key(name);
		let categories = self.categories.read().ok()?;
		categories.contains(&key).then_some(key)
	}
}
