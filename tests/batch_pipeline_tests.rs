/// End-to-end behaviour of the batch scheduler against an in-process
/// search service: bounded concurrency, caching, cache-only placeholders and
/// per-query failures.
mod common;

use blaster::bio::sequence::Query;
use blaster::search::scheduler::{BatchOptions, BatchScheduler};
use blaster::storage::cache::{CacheEntry, FingerprintCache};
use blaster::BlasterError;
use common::FakeSearch;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn queries(n: usize) -> Vec<Query> {
    let bases = ['A', 'C', 'G', 'T'];
    (0..n)
        .map(|i| {
            let suffix: String = (0..6).map(|shift| bases[(i >> (2 * shift)) & 3]).collect();
            Query::new(&format!("ACGTACGTAC{}", suffix))
        })
        .collect()
}

fn scheduler(cache: &FingerprintCache, search: Arc<FakeSearch>, workers: usize, cache_only: bool) -> BatchScheduler {
    BatchScheduler::new(
        cache.clone(),
        search,
        BatchOptions {
            database: "nt".to_string(),
            cache_only,
            workers,
        },
    )
}

#[test]
fn test_every_query_answered_within_worker_bound() {
    let dir = TempDir::new().unwrap();
    let cache = FingerprintCache::new(dir.path());
    let search = Arc::new(FakeSearch::new());

    let batch = queries(12);
    let results: Vec<_> = scheduler(&cache, search.clone(), 3, false)
        .run(batch.clone())
        .unwrap()
        .collect();

    assert_eq!(results.len(), 12);
    assert!(results.iter().all(|r| r.outcome.is_ok()));
    assert_eq!(search.calls(), 12);
    assert!(search.max_in_flight() <= 3, "peak {}", search.max_in_flight());

    for query in &batch {
        assert!(matches!(
            cache.lookup(&query.digest()).unwrap(),
            CacheEntry::Populated(_)
        ));
    }
}

#[test]
fn test_single_worker_is_sequential() {
    let dir = TempDir::new().unwrap();
    let cache = FingerprintCache::new(dir.path());
    let search = Arc::new(FakeSearch::new());

    let count = scheduler(&cache, search.clone(), 1, false)
        .run(queries(4))
        .unwrap()
        .count();

    assert_eq!(count, 4);
    assert_eq!(search.max_in_flight(), 1);
}

#[test]
fn test_second_run_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let cache = FingerprintCache::new(dir.path());
    let search = Arc::new(FakeSearch::new());

    scheduler(&cache, search.clone(), 2, false)
        .run(queries(5))
        .unwrap()
        .for_each(drop);
    assert_eq!(search.calls(), 5);

    let results: Vec<_> = scheduler(&cache, search.clone(), 2, false)
        .run(queries(5))
        .unwrap()
        .collect();
    assert_eq!(search.calls(), 5);

    for result in results {
        let report = result.outcome.unwrap().first_report().unwrap();
        assert_eq!(report.alignments.len(), 1);
    }
}

#[test]
fn test_cache_only_miss_leaves_placeholder() {
    let dir = TempDir::new().unwrap();
    let cache = FingerprintCache::new(dir.path());
    let search = Arc::new(FakeSearch::new());
    let query = Query::new("GATTACAGATTACA");

    let results: Vec<_> = scheduler(&cache, search.clone(), 1, true)
        .run(vec![query.clone()])
        .unwrap()
        .collect();

    assert_eq!(search.calls(), 0);
    assert_eq!(cache.lookup(&query.digest()).unwrap(), CacheEntry::Empty);

    let stream = results.into_iter().next().unwrap().outcome.unwrap();
    assert!(matches!(
        stream.first_report(),
        Err(BlasterError::NoResult(_))
    ));
}

#[test]
fn test_placeholders_purged_before_next_search() {
    let dir = TempDir::new().unwrap();
    let cache = FingerprintCache::new(dir.path());
    let search = Arc::new(FakeSearch::new());
    let query = Query::new("GATTACAGATTACA");

    scheduler(&cache, search.clone(), 1, true)
        .run(vec![query.clone()])
        .unwrap()
        .for_each(drop);
    assert_eq!(cache.lookup(&query.digest()).unwrap(), CacheEntry::Empty);

    let results: Vec<_> = scheduler(&cache, search.clone(), 1, false)
        .run(vec![query.clone()])
        .unwrap()
        .collect();

    assert_eq!(search.calls(), 1);
    assert!(results[0].outcome.is_ok());
    assert!(matches!(
        cache.lookup(&query.digest()).unwrap(),
        CacheEntry::Populated(_)
    ));
}

#[test]
fn test_remote_failure_does_not_stop_batch() {
    let dir = TempDir::new().unwrap();
    let cache = FingerprintCache::new(dir.path());
    let batch = queries(4);
    let failing = batch[1].clone();
    let search = Arc::new(FakeSearch::new().failing_on(failing.as_str()));

    let results: Vec<_> = scheduler(&cache, search, 2, false)
        .run(batch)
        .unwrap()
        .collect();

    assert_eq!(results.len(), 4);
    for result in &results {
        if result.query == failing {
            assert!(matches!(result.outcome, Err(BlasterError::Network(_))));
        } else {
            assert!(result.outcome.is_ok());
        }
    }
    // The claimed slot stays empty so the next run retries it
    assert_eq!(cache.lookup(&failing.digest()).unwrap(), CacheEntry::Empty);
}

#[test]
fn test_empty_response_is_persisted() {
    let dir = TempDir::new().unwrap();
    let cache = FingerprintCache::new(dir.path());
    let query = Query::new("CCCCGGGGCCCC");
    let search = Arc::new(FakeSearch::new().empty_on(query.as_str()));

    let results: Vec<_> = scheduler(&cache, search.clone(), 1, false)
        .run(vec![query.clone()])
        .unwrap()
        .collect();

    assert_eq!(search.calls(), 1);
    assert!(cache.path_for(&query.digest()).exists());
    let stream = results.into_iter().next().unwrap().outcome.unwrap();
    assert!(matches!(
        stream.first_report(),
        Err(BlasterError::NoResult(_))
    ));
}

#[test]
fn test_dropped_stream_still_populates_cache() {
    let dir = TempDir::new().unwrap();
    let cache = FingerprintCache::new(dir.path());
    let search = Arc::new(FakeSearch::new());
    let batch = queries(3);

    let mut stream = scheduler(&cache, search.clone(), 1, false)
        .run(batch.clone())
        .unwrap();
    assert!(stream.next().is_some());
    assert_eq!(stream.remaining(), 2);
    drop(stream);

    // Outstanding jobs keep running after the stream is gone
    let populated = |q: &Query| matches!(cache.lookup(&q.digest()).unwrap(), CacheEntry::Populated(_));
    let deadline = Instant::now() + Duration::from_secs(5);
    while !batch.iter().all(populated) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    assert!(batch.iter().all(populated));
}
