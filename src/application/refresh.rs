//! Full rebuild of the post cache and the route lookup.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use super::{
    fetcher::PostFetcher,
    lookup::RouteLookupCache,
    posts::{PostCache, PostCacheError},
    source::SourceError,
};

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    PostCache(#[from] PostCacheError),
}

/// Outcome of a completed rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    /// Documents matched by the publication filter.
    pub documents: usize,
    /// Posts written to the post cache; failed documents are not counted.
    pub cached_posts: usize,
    pub route_entries: usize,
    pub lookup_last_updated: i64,
    pub storage: &'static str,
}

#[derive(Clone)]
pub struct CacheRefresher {
    fetcher: PostFetcher,
    post_cache: PostCache,
    lookup: Arc<RouteLookupCache>,
}

impl CacheRefresher {
    pub fn new(fetcher: PostFetcher, post_cache: PostCache, lookup: Arc<RouteLookupCache>) -> Self {
        Self {
            fetcher,
            post_cache,
            lookup,
        }
    }

    /// List published documents, fetch each one, write the post cache,
    /// then rebuild the route lookup from the same posts.
    pub async fn refresh_all(&self) -> Result<RefreshReport, RefreshError> {
        info!(target = "canopy::refresh", "fetching posts from the CMS");
        let summaries = self.fetcher.fetch_published_posts().await?;
        let posts = self.fetcher.fetch_posts(&summaries).await;

        self.post_cache.write(&posts)?;
        info!(
            target = "canopy::refresh",
            cached = posts.len(),
            documents = summaries.len(),
            "cached posts"
        );

        let envelope = self.lookup.rebuild_from_posts(&posts).await;

        Ok(RefreshReport {
            documents: summaries.len(),
            cached_posts: posts.len(),
            route_entries: envelope.entry_count,
            lookup_last_updated: envelope.last_updated,
            storage: self.lookup.storage_label(),
        })
    }
}
