use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use prodmatch_core::config::Config;
use prodmatch_core::traits::CatalogSearch;
use prodmatch_core::types::SearchQuery;
use prodmatch_text::TantivyCatalog;

/// Query the catalog index directly, bypassing query building.
#[derive(Parser)]
#[command(name = "prodmatch-catalog-search")]
struct Args {
    /// Free-text query
    query: String,
    /// Restrict to this category
    #[arg(long)]
    category: Option<String>,
    /// Index directory (defaults to catalog.index_dir)
    #[arg(long)]
    index_dir: Option<PathBuf>,
    #[arg(long, default_value_t = 10)]
    limit: usize,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = Config::load()?.settings()?;
    let index_dir = args
        .index_dir
        .or_else(|| settings.catalog.index_path())
        .context("no index directory: pass --index-dir or set catalog.index_dir")?;
    println!("prodmatch-catalog-search\n========================");
    println!("Query: {}", args.query);
    println!("Index directory: {}", index_dir.display());

    let catalog = TantivyCatalog::open(index_dir)?;
    let hits = match &args.category {
        Some(category) => {
            if catalog.resolve_category(category).is_none() {
                println!("Category '{category}' not in catalog, searching all categories");
            }
            let terms = args.query.split_whitespace().map(str::to_string).collect();
            catalog.search(&SearchQuery::direct(terms, Some(category.clone())), args.limit)?
        }
        None => catalog.search_text(&args.query, args.limit)?,
    };

    println!("\nFound {} results for: \"{}\"", hits.len(), args.query);
    for (i, hit) in hits.iter().enumerate() {
        let stock = if hit.purchasable { "in stock" } else { "unavailable" };
        println!("\n  {}. id={}  {}  {}  ({stock})", i + 1, hit.id, hit.name, hit.display_price);
        println!("     {}", hit.permalink_url);
    }
    println!("\nCategories ({} products):", catalog.num_products());
    for (category, count) in catalog.category_counts()? {
        println!("  {category}: {count} products");
    }
    Ok(())
}
