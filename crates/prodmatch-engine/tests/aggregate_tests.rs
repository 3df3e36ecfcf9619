mod common;

use std::time::Duration;

use common::{hit, Call, FailingNotifier, RecordingCatalog, RecordingNotifier};
use prodmatch_core::extraction::parse_model_text;
use prodmatch_core::types::{IdentifiedItem, Tier};
use prodmatch_engine::{Aggregator, AggregatorConfig, BackgroundNotifier, MatchingEngine};

fn notifying() -> AggregatorConfig {
    AggregatorConfig { max_results: 5, notifications_enabled: true, notify_target: Some("+1 555 0100".into()) }
}

fn aggregator(catalog: &RecordingCatalog, config: AggregatorConfig) -> (Aggregator<&RecordingCatalog>, RecordingNotifier) {
    let notifier = RecordingNotifier::default();
    let aggregator = Aggregator::new(MatchingEngine::new(catalog), config).with_notifier(notifier.clone());
    (aggregator, notifier)
}

#[test]
fn single_direct_item() {
    let catalog = RecordingCatalog::new().answer("gel pen", vec![hit(1, "Gel Pen"), hit(2, "Gel Pen Blue")]);
    let (agg, notifier) = aggregator(&catalog, notifying());

    let result = agg.process_search(vec![IdentifiedItem::named("Gel Pen")], None, 5);
    assert_eq!(result.overall_tier, Tier::Direct);
    assert_eq!(result.matching_products.len(), 2);
    assert!(result.matching_products.iter().all(|p| p.match_tier_origin == Some(Tier::Direct)));
    assert_eq!(catalog.call_count(), 1);
    assert!(notifier.deliveries().is_empty());
}

#[test]
fn broad_fallback_item() {
    let mut item = IdentifiedItem::named("Xyzzy123");
    item.brand = Some("PenBrand".into());
    item.kind = Some("Pen".into());
    item.keywords = vec!["writing".into()];
    let catalog = RecordingCatalog::new().answer("PenBrand Pen writing xyzzy123", vec![hit(9, "PenBrand Ballpoint")]);
    let (agg, _) = aggregator(&catalog, notifying());

    let result = agg.process_search(vec![item], None, 5);
    assert_eq!(result.overall_tier, Tier::Broad);
    assert_eq!(result.matching_products[0].match_tier_origin, Some(Tier::Broad));
    assert_eq!(catalog.call_count(), 2);
}

#[test]
fn single_word_text_path() {
    let catalog = RecordingCatalog::new().answer("Nivea", vec![hit(4, "Nivea Creme")]);
    let (agg, notifier) = aggregator(&catalog, notifying());

    let result = agg.process_search(Vec::new(), Some("Nivea".into()), 5);
    assert_eq!(result.overall_tier, Tier::TextSearch);
    assert_eq!(result.matching_products[0].match_tier_origin, Some(Tier::TextSearch));
    assert_eq!(catalog.calls(), vec![Call::Text { text: "Nivea".into(), limit: 5 }]);
    assert_eq!(result.extracted_text.as_deref(), Some("Nivea"));
    assert!(notifier.deliveries().is_empty());
}

#[test]
fn single_word_text_without_hits_notifies_with_text() {
    let catalog = RecordingCatalog::new();
    let (agg, notifier) = aggregator(&catalog, notifying());

    let result = agg.process_search(Vec::new(), Some("Nivea".into()), 5);
    assert_eq!(result.overall_tier, Tier::None);
    assert_eq!(catalog.call_count(), 1);
    assert_eq!(notifier.deliveries(), vec![(Vec::new(), Some("Nivea".to_string()))]);
}

#[test]
fn multi_word_text_is_not_searched_but_still_notified() {
    let catalog = RecordingCatalog::new();
    let (agg, notifier) = aggregator(&catalog, notifying());

    let result = agg.process_search(Vec::new(), Some("Buy Milk".into()), 5);
    assert_eq!(result.overall_tier, Tier::None);
    assert_eq!(catalog.call_count(), 0);
    assert_eq!(notifier.deliveries().len(), 1);
}

#[test]
fn overlapping_ids_keep_the_first_items_tier() {
    let mut b = IdentifiedItem::named("Zzz Unknown");
    b.brand = Some("PenBrand".into());
    let catalog = RecordingCatalog::new()
        .answer("gel pen", vec![hit(42, "Gel Pen"), hit(1, "Gel Pen Blue")])
        .answer("PenBrand zzz unknown", vec![hit(42, "Gel Pen"), hit(5, "PenBrand Marker")]);
    let (agg, _) = aggregator(&catalog, notifying());

    let result = agg.process_search(vec![IdentifiedItem::named("Gel Pen"), b], None, 10);
    let ids: Vec<u64> = result.matching_products.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![42, 1, 5]);
    assert_eq!(result.matching_products[0].match_tier_origin, Some(Tier::Direct));
    assert_eq!(result.matching_products[2].match_tier_origin, Some(Tier::Broad));
    assert_eq!(result.overall_tier, Tier::Direct);
}

#[test]
fn nothing_found_notifies_once_with_all_items() {
    let items = vec![IdentifiedItem::named("Gel Pen"), IdentifiedItem::named("Spiral Notebook")];
    let catalog = RecordingCatalog::new();
    let (agg, notifier) = aggregator(&catalog, notifying());

    let result = agg.process_search(items.clone(), Some("Gel Pen Notebook".into()), 5);
    assert!(result.matching_products.is_empty());
    assert_eq!(result.overall_tier, Tier::None);
    assert_eq!(result.identified_items, items);
    assert_eq!(notifier.deliveries(), vec![(items, None)]);
}

#[test]
fn notification_is_gated_by_config() {
    let items = vec![IdentifiedItem::named("Gel Pen")];
    let catalog = RecordingCatalog::new();

    let disabled = AggregatorConfig { notifications_enabled: false, ..notifying() };
    let (agg, notifier) = aggregator(&catalog, disabled);
    agg.process_search(items.clone(), None, 5);
    assert!(notifier.deliveries().is_empty());

    let no_target = AggregatorConfig { notify_target: None, ..notifying() };
    let (agg, notifier) = aggregator(&catalog, no_target);
    agg.process_search(items, None, 5);
    assert!(notifier.deliveries().is_empty());
}

#[test]
fn nothing_to_search_and_no_text_does_not_notify() {
    let catalog = RecordingCatalog::new();
    let (agg, notifier) = aggregator(&catalog, notifying());
    let result = agg.process_search(Vec::new(), None, 5);
    assert_eq!(result.overall_tier, Tier::None);
    assert!(notifier.deliveries().is_empty());
}

#[test]
fn result_cap_holds_for_every_max_results() {
    let many: Vec<_> = (1..=8).map(|id| hit(id, "Gel Pen")).collect();
    let more: Vec<_> = (6..=12).map(|id| hit(id, "Notebook")).collect();
    let catalog = RecordingCatalog::new().answer("gel pen", many).answer("spiral notebook", more);
    let (agg, _) = aggregator(&catalog, notifying());
    let items = vec![IdentifiedItem::named("Gel Pen"), IdentifiedItem::named("Spiral Notebook")];

    for max_results in [0, 1, 3, 8, 12, 50] {
        let result = agg.process_search(items.clone(), None, max_results);
        assert!(result.matching_products.len() <= max_results);
        let ids: Vec<u64> = result.matching_products.iter().map(|p| p.id).collect();
        let expected: Vec<u64> = (1..=12).take(max_results).collect();
        assert_eq!(ids, expected, "max_results={max_results}");
    }
}

#[test]
fn truncation_decides_the_overall_tier() {
    let mut broad_item = IdentifiedItem::named("Qqq");
    broad_item.brand = Some("Acme".into());
    let catalog = RecordingCatalog::new()
        .answer("Acme qqq", vec![hit(1, "Acme Thing")])
        .answer("gel pen", vec![hit(2, "Gel Pen")]);
    let (agg, _) = aggregator(&catalog, notifying());

    let result = agg.process_search(vec![broad_item, IdentifiedItem::named("Gel Pen")], None, 1);
    assert_eq!(result.matching_products.len(), 1);
    assert_eq!(result.overall_tier, Tier::Broad);
}

#[test]
fn catalog_failure_is_recovered_per_item() {
    let catalog = RecordingCatalog::new().fail_on("gel pen").answer("spiral notebook", vec![hit(3, "Notebook")]);
    let (agg, notifier) = aggregator(&catalog, notifying());
    let result = agg.process_search(vec![IdentifiedItem::named("Gel Pen"), IdentifiedItem::named("Spiral Notebook")], None, 5);
    assert_eq!(result.matching_products.len(), 1);
    assert_eq!(result.overall_tier, Tier::Direct);
    assert!(notifier.deliveries().is_empty());
}

#[test]
fn process_uses_configured_cap_on_decoded_extraction() {
    let extraction = parse_model_text(r#"{"products":[{"product_name":"Gel Pen"}],"extracted_text":"0.5mm"}"#).expect("decode");
    let catalog = RecordingCatalog::new().answer("gel pen", (1..=4).map(|id| hit(id, "Gel Pen")).collect());
    let (agg, _) = aggregator(&catalog, AggregatorConfig { max_results: 2, ..notifying() });
    let result = agg.process(extraction);
    assert_eq!(result.matching_products.len(), 2);
    assert_eq!(result.extracted_text.as_deref(), Some("0.5mm"));
    let json = serde_json::to_value(&result).expect("json");
    assert_eq!(json["raw_output"], r#"{"products":[{"product_name":"Gel Pen"}],"extracted_text":"0.5mm"}"#);
}

#[test]
fn direct_searches_carry_no_raw_output() {
    let catalog = RecordingCatalog::new();
    let (agg, _) = aggregator(&catalog, AggregatorConfig::default());
    let result = agg.process_search(vec![IdentifiedItem::named("Gel Pen")], None, 5);
    assert!(result.raw_output.is_none());
    assert!(serde_json::to_value(&result).expect("json").get("raw_output").is_none());
}

#[test]
fn failed_notification_leaves_the_result_untouched() {
    let catalog = RecordingCatalog::new();
    let notifier = FailingNotifier::default();
    let agg = Aggregator::new(MatchingEngine::new(&catalog), notifying()).with_notifier(notifier.clone());
    let items = vec![IdentifiedItem::named("Zz Qq"), IdentifiedItem::named("Xx Ww")];

    let result = agg.process_search(items.clone(), Some("Buy Milk".into()), 5);
    assert_eq!(notifier.attempts(), 1);
    assert_eq!(result.overall_tier, Tier::None);
    assert!(result.matching_products.is_empty());
    assert_eq!(result.identified_items, items);
    assert_eq!(result.extracted_text.as_deref(), Some("Buy Milk"));
}

#[test]
fn background_notifier_delivers_after_process_returns() {
    let catalog = RecordingCatalog::new();
    let recorded = RecordingNotifier::default();
    let background = std::sync::Arc::new(BackgroundNotifier::new(recorded.clone()));
    let agg = Aggregator::new(MatchingEngine::new(&catalog), notifying()).with_notifier(std::sync::Arc::clone(&background));

    let result = agg.process_search(vec![IdentifiedItem::named("Zz Qq")], None, 5);
    assert_eq!(result.overall_tier, Tier::None);
    assert!(background.wait_idle(Duration::from_secs(5)));
    let deliveries = recorded.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].0[0].product_name.as_deref(), Some("Zz Qq"));
}
