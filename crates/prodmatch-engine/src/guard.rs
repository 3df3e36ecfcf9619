use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};

use prodmatch_core::config::MatchingSettings;
use prodmatch_core::traits::CatalogSearch;
use prodmatch_core::types::{CatalogHit, SearchQuery};

const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Puts a hard deadline on every catalog call.
///
/// Calls run on a small blocking pool. When the deadline passes the caller
/// gets an error and the late answer is discarded, but the call keeps its
/// slot until the catalog returns. With every slot taken, new calls are
/// rejected at once instead of piling up behind stuck ones.
///
/// Must not be called from inside an async runtime.
pub struct GuardedCatalog<C> {
    inner: Arc<C>,
    timeout: Duration,
    max_in_flight: usize,
    in_flight: Arc<AtomicUsize>,
    pool: Option<Runtime>,
}

/// One occupied slot, released when the catalog call finishes.
struct Slot(Arc<AtomicUsize>);

impl Slot {
    fn acquire(counter: &Arc<AtomicUsize>, max: usize) -> Option<Self> {
        counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .ok()
            .map(|_| Self(Arc::clone(counter)))
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<C: CatalogSearch + 'static> GuardedCatalog<C> {
    pub fn new(inner: C, timeout: Duration) -> anyhow::Result<Self> {
        Self::with_max_in_flight(inner, timeout, DEFAULT_MAX_IN_FLIGHT)
    }

    pub fn with_max_in_flight(inner: C, timeout: Duration, max_in_flight: usize) -> anyhow::Result<Self> {
        anyhow::ensure!(max_in_flight > 0, "max_in_flight must be at least 1");
        let pool = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(max_in_flight)
            .thread_name("prodmatch-search")
            .build()?;
        Ok(Self { inner: Arc::new(inner), timeout, max_in_flight, in_flight: Arc::new(AtomicUsize::new(0)), pool: Some(pool) })
    }

    pub fn from_settings(inner: C, settings: &MatchingSettings) -> anyhow::Result<Self> {
        Self::with_max_in_flight(inner, settings.search_timeout(), settings.max_in_flight)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Catalog calls still running, finished or not past their deadline.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    fn call<F>(&self, what: &'static str, f: F) -> anyhow::Result<Vec<CatalogHit>>
    where
        F: FnOnce(&C) -> anyhow::Result<Vec<CatalogHit>> + Send + 'static,
    {
        let Some(pool) = &self.pool else { anyhow::bail!("{what} pool is shut down") };
        let Some(slot) = Slot::acquire(&self.in_flight, self.max_in_flight) else {
            tracing::warn!(max_in_flight = self.max_in_flight, "{what} rejected, catalog is saturated");
            anyhow::bail!("{what} rejected: {} calls already in flight", self.max_in_flight)
        };
        let inner = Arc::clone(&self.inner);
        let (tx, rx) = mpsc::sync_channel(1);
        pool.spawn_blocking(move || {
            let _slot = slot;
            // the receiver is gone once the caller gave up
            tx.send(f(&inner)).ok();
        });
        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                anyhow::bail!("{what} timed out after {} ms", self.timeout.as_millis())
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => anyhow::bail!("{what} worker exited without an answer"),
        }
    }
}

impl<C> Drop for GuardedCatalog<C> {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.shutdown_background();
        }
    }
}

impl<C: CatalogSearch + 'static> CatalogSearch for GuardedCatalog<C> {
    fn search(&self, query: &SearchQuery, limit: usize) -> anyhow::Result<Vec<CatalogHit>> {
        let query = query.clone();
        self.call("catalog search", move |catalog| catalog.search(&query, limit))
    }

    fn search_text(&self, text: &str, limit: usize) -> anyhow::Result<Vec<CatalogHit>> {
        let text = text.to_string();
        self.call("catalog text search", move |catalog| catalog.search_text(&text, limit))
    }
}
