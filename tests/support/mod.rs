#![allow(dead_code)]

use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use canopy::{
    application::{
        source::{PostSource, SourceError},
        store::{LookupStore, StorageError},
    },
    domain::{
        lookup::RouteLookupEnvelope,
        posts::{Post, PostSummary},
    },
};
use tokio::sync::Mutex;

pub fn post(id: &str, title: &str, route: Option<(&str, &str)>) -> Post {
    Post {
        id: id.to_string(),
        title: title.to_string(),
        slug: canopy::domain::slug::derive_slug(title),
        cover_image: None,
        description: String::new(),
        date: "2025-01-15T09:00:00.000Z".to_string(),
        content: format!("{title} body text"),
        author: None,
        tags: vec!["Published Blog Post".to_string(), "ClimateFair".to_string()],
        category: None,
        first_slash: route.map(|(first, _)| first.to_string()),
        second_slash: route.map(|(_, second)| second.to_string()),
    }
}

/// In-memory CMS with call counters and injectable failures.
#[derive(Default)]
pub struct FakeSource {
    posts: Vec<Post>,
    failing_documents: HashSet<String>,
    fail_listing: AtomicBool,
    pub list_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            posts,
            ..Self::default()
        }
    }

    pub fn failing_document(mut self, id: &str) -> Self {
        self.failing_documents.insert(id.to_string());
        self
    }

    pub fn failing_listing(self) -> Self {
        self.set_listing_failure(true);
        self
    }

    /// Toggle listing failures on a source that is already shared.
    pub fn set_listing_failure(&self, failing: bool) {
        self.fail_listing.store(failing, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostSource for FakeSource {
    async fn published_posts(&self) -> Result<Vec<PostSummary>, SourceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(SourceError::Status {
                status: 401,
                code: "unauthorized".to_string(),
                message: "API token is invalid.".to_string(),
            });
        }
        Ok(self
            .posts
            .iter()
            .map(|post| PostSummary {
                id: post.id.clone(),
                created_time: Some(post.date.clone()),
            })
            .collect())
    }

    async fn fetch_post(&self, document_id: &str) -> Result<Post, SourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_documents.contains(document_id) {
            return Err(SourceError::Http("connection reset".to_string()));
        }
        self.posts
            .iter()
            .find(|post| post.id == document_id)
            .cloned()
            .ok_or_else(|| SourceError::Status {
                status: 404,
                code: "object_not_found".to_string(),
                message: format!("Could not find page with ID: {document_id}"),
            })
    }
}

/// Lookup store backed by a mutex, optionally failing reads or writes.
#[derive(Default)]
pub struct MemoryStore {
    pub envelope: Mutex<Option<RouteLookupEnvelope>>,
    fail_reads: bool,
    fail_writes: bool,
    pub writes: AtomicUsize,
}

impl MemoryStore {
    pub fn with_envelope(envelope: RouteLookupEnvelope) -> Self {
        Self {
            envelope: Mutex::new(Some(envelope)),
            ..Self::default()
        }
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub async fn stored(&self) -> Option<RouteLookupEnvelope> {
        self.envelope.lock().await.clone()
    }
}

#[async_trait]
impl LookupStore for MemoryStore {
    fn label(&self) -> &'static str {
        "Memory"
    }

    async fn get(&self) -> Result<Option<RouteLookupEnvelope>, StorageError> {
        if self.fail_reads {
            return Err(StorageError::Http("connection refused".to_string()));
        }
        Ok(self.envelope.lock().await.clone())
    }

    async fn set(&self, envelope: &RouteLookupEnvelope) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(StorageError::Status {
                status: 503,
                body: "edge config unavailable".to_string(),
            });
        }
        *self.envelope.lock().await = Some(envelope.clone());
        Ok(())
    }
}

/// Shared clock the tests can move forward.
#[derive(Clone, Default)]
pub struct ManualClock(Arc<std::sync::atomic::AtomicI64>);

impl ManualClock {
    pub fn at(ms: i64) -> Self {
        Self(Arc::new(std::sync::atomic::AtomicI64::new(ms)))
    }

    pub fn advance(&self, ms: i64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}
