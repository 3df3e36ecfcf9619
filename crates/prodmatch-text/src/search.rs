use anyhow::Result;
use std::collections::HashSet;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, ConstScoreQuery, Occur, Query, TermQuery};
use tantivy::schema::{Facet, IndexRecordOption, Value};
use tantivy::tokenizer::TokenStream;
use tantivy::{TantivyDocument, Term};

use prodmatch_core::traits::CatalogSearch;
use prodmatch_core::types::{CatalogHit, SearchQuery};

use crate::catalog::TantivyCatalog;

const NAME_BOOST: f32 = 2.0;

impl TantivyCatalog {
	/// Run the catalog tokenizer over `text`, keeping first occurrences only.
	fn analyze(&self, text: &str) -> Result<Vec<String>> {
		let mut analyzer = self.index.tokenizer_for_field(self.fields.name)?;
		let mut stream = analyzer.token_stream(text);
		let mut seen = HashSet::new();
		let mut terms = Vec::new();
		while stream.advance() {
			let token = stream.token().text.clone();
			if seen.insert(token.clone()) { terms.push(token); }
		}
		Ok(terms)
	}

	/// Any-term match over name (boosted) and description, restricted to
	/// published products and, when given, one category facet.
	fn build_query(&self, terms: &[String], category: Option<&str>) -> BooleanQuery {
		let f = &self.fields;
		let mut should: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(terms.len() * 2);
		for term in terms {
			let name_q = TermQuery::new(Term::from_field_text(f.name, term), IndexRecordOption::WithFreqs);
			should.push((Occur::Should, Box::new(BoostQuery::new(Box::new(name_q), NAME_BOOST))));
			let desc_q = TermQuery::new(Term::from_field_text(f.description, term), IndexRecordOption::WithFreqs);
			should.push((Occur::Should, Box::new(desc_q)));
		}
		let published = TermQuery::new(Term::from_field_u64(f.published, 1), IndexRecordOption::Basic);
		let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![
			(Occur::Must, Box::new(BooleanQuery::new(should))),
			(Occur::Must, Box::new(ConstScoreQuery::new(Box::new(published), 0.0))),
		];
		if let Some(category) = category {
			let facet = Facet::from_path([category]);
			let in_category = TermQuery::new(Term::from_facet(f.category, &facet), IndexRecordOption::Basic);
			clauses.push((Occur::Must, Box::new(ConstScoreQuery::new(Box::new(in_category), 0.0))));
		}
		BooleanQuery::new(clauses)
	}

	fn run(&self, text: &str, category: Option<&str>, limit: usize) -> Result<Vec<CatalogHit>> {
		if limit == 0 { return Ok(Vec::new()); }
		let terms = self.analyze(text)?;
		if terms.is_empty() { return Ok(Vec::new()); }
		let query = self.build_query(&terms, category);
		let searcher = self.reader.searcher();
		let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (_score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			hits.push(self.hit_from_doc(&doc)?);
		}
		tracing::trace!(query = text, ?category, hits = hits.len(), "catalog search");
		Ok(hits)
	}

	fn hit_from_doc(&self, doc: &TantivyDocument) -> Result<CatalogHit> {
		let f = &self.fields;
		let text = |field| doc.get_first(field).and_then(|v| v.as_str()).unwrap_or("").to_string();
		let id = doc.get_first(f.id).and_then(|v| v.as_u64()).ok_or_else(|| anyhow::anyhow!("stored product without id"))?;
		Ok(CatalogHit {
			id,
			name: text(f.name),
			display_price: text(f.price_html),
			raw_price: doc.get_first(f.price).and_then(|v| v.as_f64()),
			image_url: text(f.image_url),
			permalink_url: text(f.permalink),
			purchasable: doc.get_first(f.purchasable).and_then(|v| v.as_bool()).unwrap_or(false),
			match_tier_origin: None,
		})
	}
}

impl CatalogSearch for TantivyCatalog {
	fn search(&self, query: &SearchQuery, limit: usize) -> Result<Vec<CatalogHit>> {
		let category = query.category.as_deref().and_then(|name| self.resolve_category(name));
		if query.category.is_some() && category.is_none() {
			tracing::debug!(category = ?query.category, "unknown category, filter dropped");
		}
		self.run(&query.text(), category.as_deref(), limit)
	}

	fn search_text(&self, text: &str, limit: usize) -> Result<Vec<CatalogHit>> {
		self.run(text, None, limit)
	}
}
