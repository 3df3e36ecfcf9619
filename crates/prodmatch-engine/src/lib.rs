//! prodmatch-engine
//!
//! Turns identified items into catalog matches. `query` builds the direct
//! and broad queries for one item, `matcher` runs the direct-then-broad
//! waterfall, and `aggregate` merges per-item results into one capped,
//! deduplicated answer and raises the unmatched notification. `guard` and
//! `cache` wrap any `CatalogSearch` with a per-call timeout and a result
//! cache.

pub mod aggregate;
pub mod cache;
pub mod guard;
pub mod matcher;
pub mod notify;
pub mod query;

pub use aggregate::{Aggregator, AggregatorConfig};
pub use cache::CachedCatalog;
pub use guard::GuardedCatalog;
pub use matcher::{MatchingEngine, SearchLimits};
pub use notify::{BackgroundNotifier, LogNotifier};
pub use query::build_queries;
