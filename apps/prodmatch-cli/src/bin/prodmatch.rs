use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use tracing_subscriber::EnvFilter;

use prodmatch_core::config::{Config, Settings};
use prodmatch_core::extraction::parse_model_text;
use prodmatch_core::traits::CatalogSearch;
use prodmatch_core::types::AggregatedResult;
use prodmatch_engine::{
    Aggregator, AggregatorConfig, BackgroundNotifier, CachedCatalog, GuardedCatalog, LogNotifier, MatchingEngine,
    SearchLimits,
};
use prodmatch_text::{load_products, TantivyCatalog};
use prodmatch_vision::{GeminiExtractor, ImageInput};

#[derive(Parser)]
#[command(name = "prodmatch")]
#[command(about = "Match products seen in an image against a shop catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the on-disk catalog index from a JSON product export
    Index {
        /// JSON array of catalog products
        catalog: PathBuf,
        /// Index directory (defaults to catalog.index_dir)
        #[arg(long)]
        index_dir: Option<PathBuf>,
    },
    /// Match an extraction payload (the model's JSON answer) against the catalog
    Search {
        /// File with {"products": [...], "extracted_text": ...}
        extraction: PathBuf,
        #[command(flatten)]
        catalog: CatalogArgs,
        /// Result cap (defaults to matching.max_results)
        #[arg(long)]
        max_results: Option<usize>,
    },
    /// Extract products from an image and match them against the catalog
    Analyze {
        /// JPEG, PNG, GIF or WebP image
        image: PathBuf,
        #[command(flatten)]
        catalog: CatalogArgs,
        /// Result cap (defaults to matching.max_results)
        #[arg(long)]
        max_results: Option<usize>,
    },
}

#[derive(clap::Args)]
struct CatalogArgs {
    /// Open this index instead of catalog.index_dir
    #[arg(long)]
    index_dir: Option<PathBuf>,
    /// Index this JSON export in memory instead of opening an index
    #[arg(long, conflicts_with = "index_dir")]
    catalog: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {e:#}"); e })?;
    let settings = config.settings()?;
    init_tracing(settings.logging.json);

    match cli.command {
        Commands::Index { catalog, index_dir } => {
            let index_dir = index_dir
                .or_else(|| settings.catalog.index_path())
                .context("no index directory: pass --index-dir or set catalog.index_dir")?;
            run_index(&catalog, index_dir)
        }
        Commands::Search { extraction, catalog, max_results } => {
            let raw = std::fs::read_to_string(&extraction)
                .with_context(|| format!("reading extraction {}", extraction.display()))?;
            let decoded = match parse_model_text(&raw) {
                Ok(decoded) => decoded,
                Err(e) => return fail(&e),
            };
            let matcher = Matcher::new(&settings, open_catalog(&settings, &catalog)?)?;
            let max_results = max_results.unwrap_or(settings.matching.max_results);
            matcher.finish(&matcher.aggregator.process_capped(decoded, max_results))
        }
        Commands::Analyze { image, catalog, max_results } => {
            let image = match ImageInput::from_path(&image) {
                Ok(image) => image,
                Err(e) => return fail(&e),
            };
            let extractor = GeminiExtractor::from_settings(&settings.extraction)?;
            let matcher = Matcher::new(&settings, open_catalog(&settings, &catalog)?)?;
            let spinner = spinner(format!("Analyzing image with {}", settings.extraction.model));
            let extracted = tokio::runtime::Runtime::new()?.block_on(extractor.extract(&image));
            spinner.finish_and_clear();
            let decoded = match extracted {
                Ok(decoded) => decoded,
                Err(e) => return fail(&e),
            };
            let max_results = max_results.unwrap_or(settings.matching.max_results);
            matcher.finish(&matcher.aggregator.process_capped(decoded, max_results))
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr);
    if json { builder.json().init() } else { builder.init() }
}

fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

fn run_index(catalog: &Path, index_dir: PathBuf) -> anyhow::Result<()> {
    let products = load_products(catalog)?;
    let spinner = spinner(format!("Indexing {} products into {}", products.len(), index_dir.display()));
    let index = TantivyCatalog::create(index_dir.clone())?;
    let count = index.index_products(&products)?;
    spinner.finish_with_message(format!("Indexed {count} products into {}", index_dir.display()));
    for (category, n) in index.category_counts()? {
        println!("  {category}: {n} products");
    }
    Ok(())
}

fn open_catalog(settings: &Settings, args: &CatalogArgs) -> anyhow::Result<TantivyCatalog> {
    if let Some(export) = &args.catalog {
        let catalog = TantivyCatalog::in_memory()?;
        catalog.index_products(&load_products(export)?)?;
        return Ok(catalog);
    }
    let index_dir = args
        .index_dir
        .clone()
        .or_else(|| settings.catalog.index_path())
        .context("no catalog: pass --index-dir, --catalog or set catalog.index_dir")?;
    TantivyCatalog::open(index_dir.clone()).with_context(|| format!("opening catalog index {}", index_dir.display()))
}

/// Bounds how long the process waits for a pending notification on exit.
const NOTIFY_GRACE: Duration = Duration::from_secs(5);

/// The aggregator plus the background notifier it delivers through.
struct Matcher {
    aggregator: Aggregator<Box<dyn CatalogSearch>>,
    notifier: Option<Arc<BackgroundNotifier<LogNotifier>>>,
}

impl Matcher {
    /// Timeout guard around the index, then the optional query cache.
    fn new(settings: &Settings, catalog: TantivyCatalog) -> anyhow::Result<Self> {
        let guarded = GuardedCatalog::from_settings(catalog, &settings.matching)?;
        let catalog: Box<dyn CatalogSearch> = if settings.matching.cache_queries {
            Box::new(CachedCatalog::from_settings(guarded, &settings.matching))
        } else {
            Box::new(guarded)
        };
        let engine = MatchingEngine::with_limits(catalog, SearchLimits::from(&settings.matching));
        let config = AggregatorConfig::from(settings);
        let notifier = config
            .notification_target()
            .map(|target| Arc::new(BackgroundNotifier::new(LogNotifier::new(&target))));
        let aggregator = match &notifier {
            Some(notifier) => Aggregator::new(engine, config).with_notifier(Arc::clone(notifier)),
            None => Aggregator::new(engine, config),
        };
        Ok(Self { aggregator, notifier })
    }

    /// Print the result, then let a pending notification finish.
    fn finish(&self, result: &AggregatedResult) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(result)?);
        if let Some(notifier) = &self.notifier {
            if !notifier.wait_idle(NOTIFY_GRACE) {
                tracing::warn!(pending = notifier.pending(), "exiting with notifications still pending");
            }
        }
        Ok(())
    }
}

/// Fatal extraction errors are reported as JSON with the raw upstream text.
fn fail(error: &prodmatch_core::Error) -> anyhow::Result<()> {
    tracing::error!(kind = ?error.kind(), "{error}");
    let report = serde_json::json!({ "error": error.to_string(), "raw": error.raw_output() });
    println!("{}", serde_json::to_string_pretty(&report)?);
    std::process::exit(1);
}
