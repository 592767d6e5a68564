mod support;

use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
    time::Duration,
};

use canopy::application::{fetcher::PostFetcher, lookup::RouteLookupCache};
use metrics_util::debugging::DebuggingRecorder;
use support::{FakeSource, MemoryStore, post};

#[tokio::test]
async fn lookup_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let source = Arc::new(
        FakeSource::new(vec![
            post("page-a", "Grants Guide", Some(("funding", "grants-guide"))),
            post("page-b", "Broken", Some(("funding", "broken"))),
        ])
        .failing_document("page-b"),
    );
    let ttl = Duration::from_secs(60);

    // Rebuild with a failed document and a failed write, then a memory hit.
    let failing_store = Arc::new(MemoryStore::default().failing_writes());
    let lookup = RouteLookupCache::new(PostFetcher::new(source.clone()), failing_store, ttl);
    lookup.get_route_lookup_map(false).await.expect("rebuild");
    lookup.get_route_lookup_map(false).await.expect("memory hit");

    // A second process adopting the persisted envelope.
    let shared_store = Arc::new(MemoryStore::default());
    let writer = RouteLookupCache::new(PostFetcher::new(source.clone()), shared_store.clone(), ttl);
    writer.get_route_lookup_map(false).await.expect("rebuild");
    let reader = RouteLookupCache::new(PostFetcher::new(source.clone()), shared_store, ttl);
    reader.get_route_lookup_map(false).await.expect("storage hit");

    // An expired lookup whose rebuild cannot list documents.
    let stale_store = Arc::new(MemoryStore::default());
    let now = Arc::new(AtomicI64::new(0));
    let clock = now.clone();
    let stale = RouteLookupCache::new(PostFetcher::new(source.clone()), stale_store, ttl)
        .with_clock(move || clock.load(Ordering::SeqCst));
    stale.get_route_lookup_map(false).await.expect("rebuild");
    now.store(120_000, Ordering::SeqCst);
    source.set_listing_failure(true);
    stale.get_route_lookup_map(false).await.expect("stale copy");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "canopy_route_lookup_memory_hit_total",
        "canopy_route_lookup_storage_hit_total",
        "canopy_route_lookup_rebuild_total",
        "canopy_route_lookup_rebuild_ms",
        "canopy_post_fetch_failed_total",
        "canopy_storage_write_failed_total",
        "canopy_route_lookup_stale_served_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
