//! Fan queries out over a bounded worker pool and stream results back in
//! completion order.
//!
//! Each worker resolves one query: cache lookup, then either the cached
//! response, an empty placeholder (cache-only mode), or a remote search whose
//! raw response is stored before it is handed back.

use crate::bio::blast_xml::ReportStream;
use crate::bio::sequence::{Digest, Query};
use crate::core::config::Config;
use crate::search::client::RemoteSearch;
use crate::storage::cache::{CacheEntry, FingerprintCache};
use crate::BlasterError;
use crossbeam::channel::{self, Receiver};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

const LABEL_LEN: usize = 10;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub database: String,
    pub cache_only: bool,
    pub workers: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            database: "nr".to_string(),
            cache_only: false,
            workers: 1,
        }
    }
}

impl From<&Config> for BatchOptions {
    fn from(config: &Config) -> Self {
        Self {
            database: config.search.database.clone(),
            cache_only: config.search.cache_only,
            workers: config.search.workers,
        }
    }
}

/// One finished query. A failed search is reported here and does not stop
/// the rest of the batch.
pub struct BatchResult {
    pub query: Query,
    pub outcome: Result<ReportStream, BlasterError>,
}

/// Per-digest locks held across check, search and store, so identical
/// queries in one batch trigger a single remote call.
#[derive(Default)]
struct InflightLocks {
    locks: DashMap<Digest, Arc<Mutex<()>>>,
}

impl InflightLocks {
    fn lock_for(&self, digest: Digest) -> Arc<Mutex<()>> {
        self.locks.entry(digest).or_default().clone()
    }
}

struct Worker {
    cache: FingerprintCache,
    client: Arc<dyn RemoteSearch>,
    options: BatchOptions,
    inflight: InflightLocks,
}

impl Worker {
    fn resolve(&self, query: &Query) -> Result<ReportStream, BlasterError> {
        let digest = query.digest();
        let label = query.prefix(LABEL_LEN).to_string();

        let lock = self.inflight.lock_for(digest);
        let _guard = lock.lock();

        match self.cache.lookup(&digest)? {
            CacheEntry::Populated(raw) => {
                info!("{} {} Cache found", label, digest);
                Ok(ReportStream::from_bytes(label, raw))
            }
            CacheEntry::Empty => {
                warn!("{} {} Cache entry is empty", label, digest);
                Ok(ReportStream::no_result(label))
            }
            CacheEntry::Absent if self.options.cache_only => {
                warn!(
                    "{} {} Only cache is allowed, but the sequence is not in cache",
                    label, digest
                );
                self.cache.mark_empty(&digest)?;
                Ok(ReportStream::no_result(label))
            }
            CacheEntry::Absent => {
                // Claim the slot first; an interrupted search leaves an empty
                // entry that the next run purges.
                self.cache.mark_empty(&digest)?;
                info!("{} Running search with {} BP", label, query.len());
                let started = Instant::now();
                let raw = self
                    .client
                    .submit(query, &self.options.database)
                    .map_err(|e| {
                        error!("{} {} Search failed: {}", label, digest, e);
                        e
                    })?;
                info!(
                    "{} Search took {} seconds",
                    label,
                    started.elapsed().as_secs()
                );
                if raw.is_empty() {
                    warn!("{} {} Service returned an empty response", label, digest);
                }
                self.cache.store(&digest, &raw)?;
                Ok(ReportStream::from_bytes(label, raw))
            }
        }
    }
}

pub struct BatchScheduler {
    cache: FingerprintCache,
    client: Arc<dyn RemoteSearch>,
    options: BatchOptions,
}

impl BatchScheduler {
    pub fn new(cache: FingerprintCache, client: Arc<dyn RemoteSearch>, options: BatchOptions) -> Self {
        Self {
            cache,
            client,
            options,
        }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Start a batch. Empty cache entries are purged first, then every query
    /// is queued on a pool of exactly `workers` threads.
    ///
    /// Dropping the returned stream does not cancel outstanding work; those
    /// searches still finish and populate the cache.
    pub fn run(&self, queries: Vec<Query>) -> Result<BatchStream, BlasterError> {
        if self.options.workers == 0 {
            return Err(BlasterError::Config(
                "worker count must be at least 1, got 0".to_string(),
            ));
        }
        self.cache.purge_empty()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.workers)
            .thread_name(|i| format!("blaster-worker-{}", i))
            .build()
            .map_err(|e| BlasterError::Config(format!("Failed to start worker pool: {}", e)))?;

        let worker = Arc::new(Worker {
            cache: self.cache.clone(),
            client: Arc::clone(&self.client),
            options: self.options.clone(),
            inflight: InflightLocks::default(),
        });

        info!(
            "Running batch of {} queries against '{}' with {} workers{}",
            queries.len(),
            self.options.database,
            self.options.workers,
            if self.options.cache_only { " (cache only)" } else { "" }
        );

        let total = queries.len();
        let (tx, rx) = channel::unbounded();
        for query in queries {
            let tx = tx.clone();
            let worker = Arc::clone(&worker);
            pool.spawn(move || {
                let outcome = worker.resolve(&query);
                // The receiver may be gone; the cache is already written
                let _ = tx.send(BatchResult { query, outcome });
            });
        }

        Ok(BatchStream {
            results: rx,
            remaining: total,
            _pool: pool,
        })
    }
}

/// Results in completion order, one per submitted query
pub struct BatchStream {
    results: Receiver<BatchResult>,
    remaining: usize,
    _pool: rayon::ThreadPool,
}

impl BatchStream {
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl Iterator for BatchStream {
    type Item = BatchResult;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            info!("Batch done");
            return None;
        }
        let result = self.results.recv().ok()?;
        self.remaining -= 1;
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}
