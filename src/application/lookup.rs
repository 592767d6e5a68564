//! In-process route lookup with a time-to-live over a persistent store.
//!
//! Resolution order on each call: the in-memory copy while younger than
//! the TTL, then the stored envelope while younger than the TTL, then a
//! full rebuild from the CMS. A forced refresh goes straight to the rebuild.
//! When an unforced rebuild cannot list documents, the newest stale copy
//! is served instead.

use std::{sync::Arc, time::Duration, time::Instant};

use metrics::{counter, histogram};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::domain::{
    lookup::{RouteKey, RouteLookup, RouteLookupEnvelope, now_millis},
    posts::Post,
};

use super::{
    fetcher::{PostFetcher, measure_latency},
    source::SourceError,
    store::LookupStore,
};

const METRIC_MEMORY_HIT: &str = "canopy_route_lookup_memory_hit_total";
const METRIC_STORAGE_HIT: &str = "canopy_route_lookup_storage_hit_total";
const METRIC_REBUILD: &str = "canopy_route_lookup_rebuild_total";
const METRIC_REBUILD_MS: &str = "canopy_route_lookup_rebuild_ms";
const METRIC_STORAGE_WRITE_FAILED: &str = "canopy_storage_write_failed_total";
const METRIC_STALE_SERVED: &str = "canopy_route_lookup_stale_served_total";

/// Source of "now" in epoch milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub struct RouteLookupCache {
    fetcher: PostFetcher,
    store: Arc<dyn LookupStore>,
    ttl: Duration,
    clock: Clock,
    // Held across a rebuild so concurrent callers wait for one result.
    current: Mutex<Option<RouteLookupEnvelope>>,
}

impl RouteLookupCache {
    pub fn new(fetcher: PostFetcher, store: Arc<dyn LookupStore>, ttl: Duration) -> Self {
        Self {
            fetcher,
            store,
            ttl,
            clock: Arc::new(now_millis),
            current: Mutex::new(None),
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn storage_label(&self) -> &'static str {
        self.store.label()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current route lookup, rebuilding when no fresh copy exists or when
    /// `force_refresh` is set.
    ///
    /// A failure to list published posts is an error only when no stale
    /// copy exists or the refresh was forced. Individual document failures
    /// drop that document, and a failed store write still returns the
    /// rebuilt lookup.
    pub async fn get_route_lookup_map(
        &self,
        force_refresh: bool,
    ) -> Result<RouteLookupEnvelope, SourceError> {
        let mut current = self.current.lock().await;
        let now = (self.clock)();
        let mut stale = None;

        if !force_refresh {
            if let Some(envelope) = current.as_ref().filter(|e| e.is_fresh(now, self.ttl)) {
                counter!(METRIC_MEMORY_HIT).increment(1);
                return Ok(envelope.clone());
            }

            match self.load_stored().await {
                Some(envelope) if envelope.is_fresh(now, self.ttl) => {
                    counter!(METRIC_STORAGE_HIT).increment(1);
                    info!(
                        target = "canopy::route_lookup",
                        storage = self.store.label(),
                        entry_count = envelope.entry_count,
                        "loaded route lookup from storage"
                    );
                    *current = Some(envelope.clone());
                    return Ok(envelope);
                }
                Some(envelope) => {
                    info!(
                        target = "canopy::route_lookup",
                        storage = self.store.label(),
                        last_updated = envelope.last_updated,
                        "stored route lookup is stale"
                    );
                    stale = Some(envelope);
                }
                None => {}
            }

            stale = newest(stale, current.clone());
        }

        info!(
            target = "canopy::route_lookup",
            forced = force_refresh,
            "building fresh route lookup"
        );
        let started = Instant::now();
        let summaries = match self.fetcher.fetch_published_posts().await {
            Ok(summaries) => summaries,
            Err(err) => {
                let Some(envelope) = stale else {
                    return Err(err);
                };
                counter!(METRIC_STALE_SERVED).increment(1);
                warn!(
                    target = "canopy::route_lookup",
                    error = %err,
                    last_updated = envelope.last_updated,
                    entry_count = envelope.entry_count,
                    "route lookup rebuild failed; serving stale copy"
                );
                *current = Some(envelope.clone());
                return Ok(envelope);
            }
        };
        let mut lookup = RouteLookup::new();
        for summary in &summaries {
            if let Some(post) = self.fetcher.fetch_post(&summary.id).await {
                insert_route(&mut lookup, &post);
            }
        }
        counter!(METRIC_REBUILD).increment(1);
        histogram!(METRIC_REBUILD_MS).record(started.elapsed().as_secs_f64() * 1000.0);

        let envelope = RouteLookupEnvelope::new(lookup, now);
        *current = Some(envelope.clone());
        self.persist(&envelope).await;

        info!(
            target = "canopy::route_lookup",
            entry_count = envelope.entry_count,
            documents = summaries.len(),
            "built fresh route lookup"
        );
        Ok(envelope)
    }

    /// Replace the lookup with one derived from already-fetched posts.
    pub async fn rebuild_from_posts(&self, posts: &[Post]) -> RouteLookupEnvelope {
        let mut current = self.current.lock().await;
        let envelope = RouteLookupEnvelope::new(build_lookup(posts), (self.clock)());
        counter!(METRIC_REBUILD).increment(1);
        *current = Some(envelope.clone());
        self.persist(&envelope).await;
        info!(
            target = "canopy::route_lookup",
            entry_count = envelope.entry_count,
            "rebuilt route lookup from fetched posts"
        );
        envelope
    }

    /// Resolve a nested route and fetch the mapped document live from the
    /// CMS. Unmapped routes and failed fetches both yield `None`.
    pub async fn get_post_by_route(
        &self,
        first: &str,
        second: &str,
    ) -> Result<Option<Post>, SourceError> {
        let Ok(key) = RouteKey::new(first, second) else {
            return Ok(None);
        };

        let envelope = self.get_route_lookup_map(false).await?;
        let Some(document_id) = envelope.lookup.resolve(&key) else {
            return Ok(None);
        };

        let operation = format!("get post by route {key}");
        Ok(measure_latency(&operation, self.fetcher.fetch_post(document_id)).await)
    }

    async fn load_stored(&self) -> Option<RouteLookupEnvelope> {
        match self.store.get().await {
            Ok(envelope) => envelope,
            Err(err) => {
                error!(
                    target = "canopy::route_lookup",
                    storage = self.store.label(),
                    error = %err,
                    "failed to read stored route lookup"
                );
                None
            }
        }
    }

    async fn persist(&self, envelope: &RouteLookupEnvelope) {
        if let Err(err) = self.store.set(envelope).await {
            counter!(METRIC_STORAGE_WRITE_FAILED).increment(1);
            warn!(
                target = "canopy::route_lookup",
                storage = self.store.label(),
                error = %err,
                "failed to persist route lookup; keeping in-memory copy"
            );
        }
    }
}

fn newest(
    a: Option<RouteLookupEnvelope>,
    b: Option<RouteLookupEnvelope>,
) -> Option<RouteLookupEnvelope> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b.last_updated > a.last_updated { b } else { a }),
        (a, b) => a.or(b),
    }
}

/// Lookup holding every post that carries both route segments.
pub fn build_lookup(posts: &[Post]) -> RouteLookup {
    let mut lookup = RouteLookup::new();
    for post in posts {
        insert_route(&mut lookup, post);
    }
    lookup
}

fn insert_route(lookup: &mut RouteLookup, post: &Post) {
    if let Some(key) = post.route_key() {
        lookup.insert(&key, post.id.clone());
    }
}
