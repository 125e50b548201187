//! Verifies that pool activity is reported via `nm` events.
//!
//! This test is in a separate integration test binary to avoid other tests contributing
//! observations to the same global event registry.

use std::num::NonZero;

use nm::Report;
use recycling_pool::{ReclaimingStore, RecyclingPool};

fn count_of(report: &Report, name: &str) -> u64 {
    report
        .events()
        .find(|event| event.name() == name)
        .map_or(0, nm::EventMetrics::count)
}

#[test]
fn pool_activity_is_observable() {
    let pool = RecyclingPool::builder()
        .shard_count(NonZero::new(1).unwrap())
        .build(String::new);

    // Miss, then hit.
    let text = pool.acquire();
    pool.release(text);
    let text = pool.acquire();
    pool.release(text);

    // Demote, then drop the one idle value.
    pool.store().reclaim();
    pool.store().reclaim();

    // No fallback hook, so this one falls back to the zero value.
    let empty = RecyclingPool::<u32, _>::from_store(ReclaimingStore::new());
    assert_eq!(empty.acquire(), 0);

    let report = Report::collect();

    assert_eq!(count_of(&report, "recycling_pool_acquire_hits"), 1);
    assert_eq!(count_of(&report, "recycling_pool_acquire_misses"), 2);
    assert_eq!(count_of(&report, "recycling_pool_releases"), 2);
    assert_eq!(count_of(&report, "recycling_pool_reclaimed_values"), 2);
    assert_eq!(count_of(&report, "recycling_pool_zero_fallbacks"), 1);

    let reclaimed = report
        .events()
        .find(|event| event.name() == "recycling_pool_reclaimed_values")
        .expect("reclamation cycles were observed");
    assert_eq!(reclaimed.sum(), 1);
}
