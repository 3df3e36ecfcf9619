use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FacetOptions, FAST, INDEXED, STORED};
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

pub const CATALOG_TOKENIZER: &str = "catalog_text";

/// Handles to every field of the catalog schema.
#[derive(Debug, Clone, Copy)]
pub struct CatalogFields {
	pub id: Field,
	pub name: Field,
	pub description: Field,
	pub category: Field,
	pub published: Field,
	pub price_html: Field,
	pub price: Field,
	pub image_url: Field,
	pub permalink: Field,
	pub purchasable: Field,
}

impl CatalogFields {
	pub fn from_schema(schema: &Schema) -> tantivy::Result<Self> {
		Ok(Self {
			id: schema.get_field("id")?,
			name: schema.get_field("name")?,
			description: schema.get_field("description")?,
			category: schema.get_field("category")?,
			published: schema.get_field("published")?,
			price_html: schema.get_field("price_html")?,
			price: schema.get_field("price")?,
			image_url: schema.get_field("image_url")?,
			permalink: schema.get_field("permalink")?,
			purchasable: schema.get_field("purchasable")?,
		})
	}
}

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_u64_field("id", INDEXED | STORED | FAST);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(CATALOG_TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let name_options = TextOptions::default().set_indexing_options(text_field_indexing.clone()).set_stored();
	schema_builder.add_text_field("name", name_options);
	schema_builder.add_text_field("description", TextOptions::default().set_indexing_options(text_field_indexing));
	schema_builder.add_facet_field("category", FacetOptions::default());
	schema_builder.add_u64_field("published", INDEXED);
	schema_builder.add_text_field("price_html", STORED);
	schema_builder.add_f64_field("price", STORED);
	schema_builder.add_text_field("image_url", STORED);
	schema_builder.add_text_field("permalink", STORED);
	schema_builder.add_bool_field("purchasable", STORED);
	schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
	let stop_words = vec![
		"a","an","and","are","as","at","be","by","for","from","in","is","it","its","of","on","or","the","to","with",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(RemoveLongFilter::limit(40))
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.build();
	index.tokenizers().register(CATALOG_TOKENIZER, tokenizer);
}
