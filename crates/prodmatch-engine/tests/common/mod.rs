#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use prodmatch_core::traits::{CatalogSearch, Notifier};
use prodmatch_core::types::{CatalogHit, IdentifiedItem, QueryTier, SearchQuery};

pub fn hit(id: u64, name: &str) -> CatalogHit {
    CatalogHit {
        id,
        name: name.to_string(),
        display_price: format!("${id}.00"),
        raw_price: Some(id as f64),
        image_url: format!("https://shop.test/{id}.jpg"),
        permalink_url: format!("https://shop.test/p/{id}"),
        purchasable: true,
        match_tier_origin: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Search { text: String, category: Option<String>, tier: QueryTier, limit: usize },
    Text { text: String, limit: usize },
}

/// Scripted catalog: answers by exact query text, records every call.
#[derive(Default)]
pub struct RecordingCatalog {
    answers: HashMap<String, Vec<CatalogHit>>,
    failing: Vec<String>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, text: &str, hits: Vec<CatalogHit>) -> Self {
        self.answers.insert(text.to_string(), hits);
        self
    }

    pub fn fail_on(mut self, text: &str) -> Self {
        self.failing.push(text.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls").len()
    }

    fn respond(&self, text: &str, limit: usize) -> anyhow::Result<Vec<CatalogHit>> {
        if self.failing.iter().any(|f| f == text) {
            anyhow::bail!("catalog offline");
        }
        let mut hits = self.answers.get(text).cloned().unwrap_or_default();
        hits.truncate(limit);
        Ok(hits)
    }
}

impl CatalogSearch for RecordingCatalog {
    fn search(&self, query: &SearchQuery, limit: usize) -> anyhow::Result<Vec<CatalogHit>> {
        let text = query.text();
        self.calls.lock().expect("calls").push(Call::Search {
            text: text.clone(),
            category: query.category.clone(),
            tier: query.tier,
            limit,
        });
        self.respond(&text, limit)
    }

    fn search_text(&self, text: &str, limit: usize) -> anyhow::Result<Vec<CatalogHit>> {
        self.calls.lock().expect("calls").push(Call::Text { text: text.to_string(), limit });
        self.respond(text, limit)
    }
}

pub type Delivery = (Vec<IdentifiedItem>, Option<String>);

/// Notifier that keeps every delivery; clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl RecordingNotifier {
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().expect("deliveries").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, items: &[IdentifiedItem], text: Option<&str>) -> anyhow::Result<()> {
        self.deliveries.lock().expect("deliveries").push((items.to_vec(), text.map(str::to_string)));
        Ok(())
    }
}

/// Notifier whose every delivery fails; counts the attempts.
#[derive(Clone, Default)]
pub struct FailingNotifier {
    attempts: Arc<Mutex<usize>>,
}

impl FailingNotifier {
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().expect("attempts")
    }
}

impl Notifier for FailingNotifier {
    fn notify(&self, _items: &[IdentifiedItem], _text: Option<&str>) -> anyhow::Result<()> {
        *self.attempts.lock().expect("attempts") += 1;
        anyhow::bail!("messaging gateway unreachable")
    }
}
