//! Post retrieval with the skip-on-failure policy applied.

use std::{future::Future, sync::Arc, time::Instant};

use metrics::counter;
use tracing::{error, info};

use crate::domain::posts::{Post, PostSummary};

use super::source::{PostSource, SourceError};

const METRIC_POST_FETCH_FAILED: &str = "canopy_post_fetch_failed_total";

#[derive(Clone)]
pub struct PostFetcher {
    source: Arc<dyn PostSource>,
}

impl PostFetcher {
    pub fn new(source: Arc<dyn PostSource>) -> Self {
        Self { source }
    }

    /// Summaries of every published document. Source failures propagate.
    pub async fn fetch_published_posts(&self) -> Result<Vec<PostSummary>, SourceError> {
        measure_latency("fetch published posts", self.source.published_posts()).await
    }

    /// Full post for `document_id`, or `None` when retrieval or mapping
    /// failed. Failures are logged and counted.
    pub async fn fetch_post(&self, document_id: &str) -> Option<Post> {
        match self.source.fetch_post(document_id).await {
            Ok(post) => Some(post),
            Err(err) => {
                counter!(METRIC_POST_FETCH_FAILED).increment(1);
                error!(
                    target = "canopy::fetcher",
                    document_id = document_id,
                    error = %err,
                    "failed to fetch post; skipping"
                );
                None
            }
        }
    }

    /// Fetch details for each summary in order, one at a time, dropping the
    /// documents that fail.
    pub async fn fetch_posts(&self, summaries: &[PostSummary]) -> Vec<Post> {
        let mut posts = Vec::with_capacity(summaries.len());
        for summary in summaries {
            if let Some(post) = self.fetch_post(&summary.id).await {
                posts.push(post);
            }
        }
        posts
    }
}

/// Log the start and completion of `operation` with its elapsed time.
pub async fn measure_latency<T>(operation: &str, future: impl Future<Output = T>) -> T {
    let started = Instant::now();
    info!(target = "canopy::latency", operation = operation, "starting");
    let output = future.await;
    info!(
        target = "canopy::latency",
        operation = operation,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "completed"
    );
    output
}
