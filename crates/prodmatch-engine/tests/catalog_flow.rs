use std::time::Duration;

use prodmatch_core::extraction::parse_model_text;
use prodmatch_core::types::Tier;
use prodmatch_engine::{Aggregator, AggregatorConfig, CachedCatalog, GuardedCatalog, MatchingEngine};
use prodmatch_text::{CatalogProduct, TantivyCatalog};

fn product(id: u64, name: &str, category: &str) -> CatalogProduct {
    CatalogProduct {
        id,
        name: name.to_string(),
        description: String::new(),
        categories: vec![category.to_string()],
        price_html: Some(format!("${id}.00")),
        price: Some(id as f64),
        image_url: None,
        permalink: format!("https://shop.test/p/{id}"),
        status: "publish".to_string(),
        purchasable: true,
        in_stock: true,
    }
}

#[test]
fn extraction_to_matches_over_a_real_index() {
    let catalog = TantivyCatalog::in_memory().expect("catalog");
    catalog
        .index_products(&[
            product(1, "PenBrand Gel Pen Fine Point", "Pen"),
            product(2, "NotesCo Premium College Ruled Notebook", "Notebook"),
            product(3, "PenBrand Ballpoint Classic", "Pen"),
        ])
        .expect("index");

    let extraction = parse_model_text(
        r#"{"products":[
            {"brand":"PenBrand","product_name":"Gel Pen Fine Point","type":"Pen","keywords":["gel pen"]},
            {"brand":"NotesCo","product_name":"Zz Qq","type":"Notebook","keywords":["college ruled"]}
        ],"extracted_text":"0.5mm Black Ink"}"#,
    )
    .expect("decode");

    let guarded = GuardedCatalog::new(catalog, Duration::from_secs(5)).expect("guard");
    let engine = MatchingEngine::new(CachedCatalog::new(guarded));
    let aggregator = Aggregator::new(engine, AggregatorConfig::default());
    let result = aggregator.process(extraction);

    assert_eq!(result.overall_tier, Tier::Direct);
    let first = &result.matching_products[0];
    assert_eq!(first.id, 1);
    assert_eq!(first.match_tier_origin, Some(Tier::Direct));
    let notebook = result.matching_products.iter().find(|p| p.id == 2).expect("notebook via broad");
    assert_eq!(notebook.match_tier_origin, Some(Tier::Broad));
    assert!(result.matching_products.len() <= 5);
}
